//! The command abstraction
//!
//! A command is a method name plus a parameter shape and a result shape.
//! The client's single generic send operation is parameterized by a
//! [`Command`], so adding a command never touches the transport or the
//! request correlation code.

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize};

/// A request the server understands
pub trait Command: 'static {
    /// Wire method name
    const METHOD: &'static str;

    /// Parameter shape, serialized as the request's `params`
    type Params: Serialize + Send + Sync;

    /// Result shape, decoded from the response's `result`
    type Result: DeserializeOwned + Send + 'static;
}

/// Parameters of a command that takes none; serializes as `{}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NoParams {}

/// Result of a command whose response carries nothing useful
///
/// Accepts any result value, including an absent one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Empty;

impl<'de> Deserialize<'de> for Empty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer)?;
        Ok(Empty)
    }
}

/// Declares the command table
///
/// Each row expands to a unit struct implementing [`Command`]; the method
/// names are also collected into `METHODS`.
macro_rules! commands {
    ($(
        $(#[$meta:meta])*
        $name:ident => $method:literal, $params:ty => $result:ty;
    )*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $name;

            impl $crate::command::Command for $name {
                const METHOD: &'static str = $method;
                type Params = $params;
                type Result = $result;
            }
        )*

        /// Method names of every command in the table
        pub const METHODS: &[&str] = &[$($method),*];
    };
}

pub(crate) use commands;
