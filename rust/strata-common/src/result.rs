use crate::error::{Error, ErrorKind};

pub type Result<T> = std::result::Result<T, Error>;

/// Checks a caller-supplied argument; the failure is a configuration fault.
#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

/// Checks decoded data; the failure is a decode fault for the current batch.
#[inline]
pub fn verify_data(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_format(name, condition)
    }
}

/// Validates a shard index against the configured shard set.
#[inline]
pub fn verify_shard_index(index: usize, shard_count: usize) -> Result<()> {
    if index < shard_count {
        Ok(())
    } else {
        Err(Error::shard_index_out_of_range(index, shard_count))
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: format!("violated `{condition}`"),
    }
    .into())
}

#[cold]
pub fn invalid_format(name: &str, condition: &str) -> Result<()> {
    Err(ErrorKind::InvalidFormat {
        element: name.to_string(),
        message: format!("violated `{condition}`"),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{verify_arg, verify_data};

    fn check_len(len: usize) -> Result<()> {
        verify_arg!(len, len > 0);
        Ok(())
    }

    fn check_magic(magic: u8) -> Result<()> {
        verify_data!(magic, magic == 0x5a);
        Ok(())
    }

    #[test]
    fn test_verify_macros() {
        assert!(check_len(1).is_ok());
        let err = check_len(0).unwrap_err();
        assert!(err.is_configuration_fault());
        assert!(err.to_string().contains("len > 0"));

        assert!(check_magic(0x5a).is_ok());
        let err = check_magic(1).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidFormat { .. }));
    }

    #[test]
    fn test_verify_shard_index() {
        assert!(verify_shard_index(0, 1).is_ok());
        assert!(verify_shard_index(1, 1).is_err());
    }
}
