/// Turns a failed lookup into `None`, logging the error on the way out.
///
/// Every public resolver in this crate degrades to a zero value instead of
/// failing; this is where the swallowed error becomes visible with `RUST_LOG=debug`.
pub trait ResultOkLogExt<T, E> {
    fn ok_log(self) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::debug!("{err}");
                None
            }
        }
    }
}
