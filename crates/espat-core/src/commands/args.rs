//! Write-argument parsing helpers.
//!
//! Arguments are comma-separated; string fields may be double-quoted, with
//! commas inside quotes kept literal. Malformed input maps to
//! [`AtError::ArgumentError`] instead of silently using defaults.

use std::str::FromStr;

use espat_parser::AtError;

/// Split an argument string into fields, honoring double quotes.
///
/// Quotes are stripped from the returned fields. An unterminated quote is an
/// error.
pub(crate) fn split_args(args: &str) -> Result<Vec<String>, AtError> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in args.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if in_quotes {
        return Err(AtError::ArgumentError(format!(
            "unterminated quote in {:?}",
            args
        )));
    }
    fields.push(current);
    Ok(fields)
}

/// Split and require an exact field count.
pub(crate) fn expect_args(args: &str, count: usize) -> Result<Vec<String>, AtError> {
    let fields = split_args(args)?;
    if fields.len() != count {
        return Err(AtError::ArgumentError(format!(
            "expected {} fields, got {}: {:?}",
            count,
            fields.len(),
            args
        )));
    }
    Ok(fields)
}

/// Parse one integer field.
pub(crate) fn parse_int<T: FromStr>(field: &str) -> Result<T, AtError> {
    field
        .trim()
        .parse()
        .map_err(|_| AtError::ArgumentError(format!("not a number: {:?}", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain() {
        assert_eq!(split_args("1,2").unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn test_split_quoted() {
        assert_eq!(
            split_args("\"my ssid\",\"pass,word\"").unwrap(),
            vec!["my ssid", "pass,word"]
        );
    }

    #[test]
    fn test_split_mixed() {
        assert_eq!(
            split_args("\"ap\",\"pw\",6,3,4,0").unwrap(),
            vec!["ap", "pw", "6", "3", "4", "0"]
        );
    }

    #[test]
    fn test_unterminated_quote() {
        assert!(split_args("\"oops").is_err());
    }

    #[test]
    fn test_expect_args_count() {
        assert!(expect_args("1,2", 2).is_ok());
        assert!(expect_args("1,2", 3).is_err());
        assert!(expect_args("1,2,3", 2).is_err());
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int::<u16>("333").unwrap(), 333);
        assert_eq!(parse_int::<u16>(" 7 ").unwrap(), 7);
        assert!(parse_int::<u16>("abc").is_err());
        assert!(parse_int::<u16>("").is_err());
    }
}
