pub mod auth;
pub mod cache;
pub mod config;
pub mod policy;
pub mod trail;
pub mod validator;
#[cfg(test)]
pub mod tests;

pub static USER_AGENT: &str = concat!("smtp-sts-verify/", env!("CARGO_PKG_VERSION"),);

pub trait UnwrapFailure<T> {
    fn failed(self, action: &str) -> T;
}

impl<T, E: std::fmt::Display> UnwrapFailure<T> for Result<T, E> {
    fn failed(self, message: &str) -> T {
        match self {
            Ok(result) => result,
            Err(err) => {
                eprintln!("{message}: {err}");
                std::process::exit(1);
            }
        }
    }
}
