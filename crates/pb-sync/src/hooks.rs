use async_trait::async_trait;
use pb_types::RemoteData;

/// Called once before an entity is created on the home network. May return a
/// replacement for the supplied data, e.g. with a fuller profile.
#[async_trait]
pub trait CreateHook<D: RemoteData>: Send + Sync {
    async fn on_create(&self, requested: &D) -> Option<D>;
}

/// Adapter turning a synchronous function into a [`CreateHook`].
pub struct FnCreateHook<F>(pub F);

#[async_trait]
impl<D, F> CreateHook<D> for FnCreateHook<F>
where
    D: RemoteData,
    F: Fn(&D) -> Option<D> + Send + Sync,
{
    async fn on_create(&self, requested: &D) -> Option<D> {
        (self.0)(requested)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverrideOutcome<D> {
    Accepted(D),
    Rejected { reason: String },
}

/// Check a create-hook replacement against the request. The replacement must
/// describe the same remote entity seen through the same puppet.
pub fn validate_override<D: RemoteData>(requested: &D, candidate: D) -> OverrideOutcome<D> {
    let want = requested.request_key();
    let got = candidate.request_key();
    if want == got {
        OverrideOutcome::Accepted(candidate)
    } else {
        OverrideOutcome::Rejected {
            reason: format!("override is for {got}, request was for {want}"),
        }
    }
}
