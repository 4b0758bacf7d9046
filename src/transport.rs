/// Byte link to the card reader module.
///
/// The driver never blocks on it: it checks [`bytes_available`] and only then
/// reads a full response window with a zero timeout.
///
/// [`bytes_available`]: ReaderTransport::bytes_available
pub trait ReaderTransport {
    /// Error type for transport operations
    type Error: std::fmt::Debug;

    /// Send a command frame, returning how many bytes went out
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Read into `buf`, waiting at most `timeout_ms`; 0 means return at once
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error>;

    /// Discard stale replies before a new command
    fn clear_input(&mut self) -> Result<(), Self::Error>;

    /// Number of received bytes waiting to be read
    fn bytes_available(&mut self) -> Result<usize, Self::Error>;
}
