/// Simple macro to generate PathBuf from a series of entries
///
#[macro_export]
macro_rules! makepath {
    ($($item:expr),+) => {
        [
        $(std::path::PathBuf::from($item),)+
        ]
        .iter()
        .collect::<std::path::PathBuf>()
    };
}
