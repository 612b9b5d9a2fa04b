#[derive(Debug, PartialEq, Eq)]
/// UART transceiver errors
pub enum UartError<S, P> {
    /// UART errors.
    Serial(S),
    /// Sense pin errors.
    Pin(P),
    /// The echo of a slot did not arrive within the retry budget.
    RetriesExceeded,
}
