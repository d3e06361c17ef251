use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns `true` for faults detected while configuring a reader: invalid
    /// arguments, unsupported conversions, out-of-range shard indexes and
    /// fields mapped with incompatible types. These are never retried.
    ///
    /// Everything else is raised while reading a batch and is fatal for that
    /// batch only.
    pub fn is_configuration_fault(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidArgument { .. }
                | ErrorKind::UnsupportedConversion { .. }
                | ErrorKind::ShardIndexOutOfRange { .. }
                | ErrorKind::InvalidMappedField { .. }
        )
    }

    pub fn invalid_format(name: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: name.into(),
                message: Default::default(),
            }
            .into(),
        )
    }

    pub fn invalid_format_msg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn not_implemented(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::NotImplemented {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    pub fn unsupported_conversion(from: impl Into<String>, to: impl Into<String>) -> Error {
        Error(
            ErrorKind::UnsupportedConversion {
                from: from.into(),
                to: to.into(),
            }
            .into(),
        )
    }

    pub fn shard_index_out_of_range(index: usize, shard_count: usize) -> Error {
        Error(ErrorKind::ShardIndexOutOfRange { index, shard_count }.into())
    }

    pub fn invalid_mapped_field(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidMappedField {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn value_conversion(value: impl Into<String>, target: impl Into<String>) -> Error {
        Error(
            ErrorKind::ValueConversion {
                value: value.into(),
                target: target.into(),
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("not yet implemented: {message}")]
    NotImplemented { message: String },

    #[error("invalid storage format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("IO error for '{context}': {source}'")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("conversion from [{from}] to [{to}] is not supported")]
    UnsupportedConversion { from: String, to: String },

    #[error("unexpected shard index [{index}], expected one of [0..{shard_count})")]
    ShardIndexOutOfRange { index: usize, shard_count: usize },

    #[error("cannot use field [{name}]: {message}")]
    InvalidMappedField { name: String, message: String },

    #[error("cannot convert [{value}] to [{target}]")]
    ValueConversion { value: String, target: String },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(_: std::convert::Infallible) -> Self {
        Error::invalid_operation("conversion")
    }
}
