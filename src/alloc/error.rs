/// Expected negative outcomes of an allocation request.
///
/// These are results, not faults — the transport surfaces them to the
/// caller as structured denials, never as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// Client spent its whole attempt quota for the current reset window.
    RateLimited { client: String },
    /// No slot with remaining capacity exists for the rest of the day.
    Exhausted,
}

impl std::fmt::Display for Denial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Denial::RateLimited { client } => {
                write!(f, "request quota exhausted for client: {client}")
            }
            Denial::Exhausted => write!(f, "no remaining slot capacity for today"),
        }
    }
}

impl std::error::Error for Denial {}
