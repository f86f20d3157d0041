/// Decide and evolve in one step.
///
/// Calls `handle`, then applies every returned event to `aggregate` in order.
/// On error the aggregate is left untouched, since `handle` never mutates.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: larder_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
