/// How far a market data failure reaches.
///
/// | Scope | Meaning | Caller reaction |
/// |-------|---------|-----------------|
/// | `Quote` | One symbol/date has no price | Apply missing-price policy, keep going |
/// | `Source` | The provider cannot be reached at all | Abort the computation |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorScope {
    /// The failure is local to a single quote request.
    Quote,

    /// The provider is unreachable or rejected our credentials.
    Source,
}
