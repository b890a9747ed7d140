//! Deterministic cache keys for operation calls
//!
//! A key is the operation identifier followed by the positional arguments in
//! call order and the named arguments sorted by name:
//!
//! ```text
//! get_awards_data(48, 2019){}
//! lookup('NASA',){'strict': True}
//! ```
//!
//! Integers and strings are written the way the original Python tool wrote
//! them, so keys in an existing `cache.json` keep matching.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write;

use super::CacheError;

/// A value that has a stable, canonical textual form inside a [`CacheKey`]
///
/// Unordered collections such as `HashMap` intentionally do not implement
/// this trait. Use a `BTreeMap` or a sorted `Vec` instead.
pub trait KeyArg {
    /// Appends the canonical form of `self` to `out`.
    ///
    /// Returns the reason as `Err` when the value has no deterministic form.
    fn write_key(&self, out: &mut String) -> Result<(), &'static str>;
}

/// An argument list that can be turned into a [`CacheKey`]
///
/// Implemented for `()` and tuples of up to four [`KeyArg`]s. Types carrying
/// named arguments override [`KeyArgs::named`].
pub trait KeyArgs {
    /// Positional arguments in call order
    fn positional(&self) -> Vec<&dyn KeyArg>;

    /// Named arguments in any order
    fn named(&self) -> Vec<(&str, &dyn KeyArg)> {
        Vec::new()
    }
}

/// Opaque, immutable key identifying one (operation, arguments) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Encodes an operation identifier and its arguments into a key
    ///
    /// # Errors
    /// * `CacheError::UnencodableArgument` if the identifier is empty or
    ///   contains a delimiter, an argument has no deterministic form, or two
    ///   named arguments share a name
    pub fn encode(
        operation: &str,
        positional: &[&dyn KeyArg],
        named: &[(&str, &dyn KeyArg)],
    ) -> Result<Self, CacheError> {
        if operation.is_empty() || operation.contains(['(', '{']) {
            return Err(CacheError::unencodable(
                operation,
                "operation identifier must be non-empty and free of '(' and '{'",
            ));
        }

        let mut key = String::from(operation);

        key.push('(');
        for (i, arg) in positional.iter().enumerate() {
            if i > 0 {
                key.push_str(", ");
            }
            arg.write_key(&mut key)
                .map_err(|reason| CacheError::unencodable(operation, reason))?;
        }
        if positional.len() == 1 {
            key.push(',');
        }
        key.push(')');

        let mut sorted: Vec<&(&str, &dyn KeyArg)> = named.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        if sorted.windows(2).any(|pair| pair[0].0 == pair[1].0) {
            return Err(CacheError::unencodable(
                operation,
                "named argument given more than once",
            ));
        }

        key.push('{');
        for (i, (name, arg)) in sorted.into_iter().enumerate() {
            if i > 0 {
                key.push_str(", ");
            }
            write_quoted(name, &mut key);
            key.push_str(": ");
            arg.write_key(&mut key)
                .map_err(|reason| CacheError::unencodable(operation, reason))?;
        }
        key.push('}');

        Ok(Self(key))
    }

    /// Encodes a call whose arguments are described by [`KeyArgs`]
    pub fn for_args<A: KeyArgs + ?Sized>(operation: &str, args: &A) -> Result<Self, CacheError> {
        Self::encode(operation, &args.positional(), &args.named())
    }

    /// Returns the textual form stored in the cache document
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Writes a string literal, quoted and escaped like a Python `repr`
fn write_quoted(s: &str, out: &mut String) {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };

    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                // Writing to a String cannot fail
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}

macro_rules! impl_key_arg_int {
    ($($t:ty),*) => {
        $(
            impl KeyArg for $t {
                fn write_key(&self, out: &mut String) -> Result<(), &'static str> {
                    let _ = write!(out, "{}", self);
                    Ok(())
                }
            }
        )*
    };
}

impl_key_arg_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl KeyArg for bool {
    fn write_key(&self, out: &mut String) -> Result<(), &'static str> {
        out.push_str(if *self { "True" } else { "False" });
        Ok(())
    }
}

impl KeyArg for f64 {
    fn write_key(&self, out: &mut String) -> Result<(), &'static str> {
        if !self.is_finite() {
            return Err("non-finite float has no stable key form");
        }
        let _ = write!(out, "{:?}", self);
        Ok(())
    }
}

impl KeyArg for str {
    fn write_key(&self, out: &mut String) -> Result<(), &'static str> {
        write_quoted(self, out);
        Ok(())
    }
}

impl KeyArg for String {
    fn write_key(&self, out: &mut String) -> Result<(), &'static str> {
        self.as_str().write_key(out)
    }
}

impl<T: KeyArg + ?Sized> KeyArg for &T {
    fn write_key(&self, out: &mut String) -> Result<(), &'static str> {
        (**self).write_key(out)
    }
}

impl<T: KeyArg> KeyArg for Option<T> {
    fn write_key(&self, out: &mut String) -> Result<(), &'static str> {
        match self {
            Some(value) => {
                let start = out.len();
                value.write_key(out)?;
                // Some(None) would render the same as None
                if &out[start..] == "None" {
                    return Err("nested None is ambiguous");
                }
                Ok(())
            }
            None => {
                out.push_str("None");
                Ok(())
            }
        }
    }
}

impl<T: KeyArg> KeyArg for [T] {
    fn write_key(&self, out: &mut String) -> Result<(), &'static str> {
        out.push('[');
        for (i, item) in self.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            item.write_key(out)?;
        }
        out.push(']');
        Ok(())
    }
}

impl<T: KeyArg> KeyArg for Vec<T> {
    fn write_key(&self, out: &mut String) -> Result<(), &'static str> {
        self.as_slice().write_key(out)
    }
}

impl<T: KeyArg> KeyArg for BTreeMap<String, T> {
    fn write_key(&self, out: &mut String) -> Result<(), &'static str> {
        out.push('{');
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_quoted(name, out);
            out.push_str(": ");
            value.write_key(out)?;
        }
        out.push('}');
        Ok(())
    }
}

impl KeyArgs for () {
    fn positional(&self) -> Vec<&dyn KeyArg> {
        Vec::new()
    }
}

macro_rules! impl_key_args_tuple {
    ($($name:ident),+) => {
        impl<$($name: KeyArg),+> KeyArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn positional(&self) -> Vec<&dyn KeyArg> {
                let ($($name,)+) = self;
                vec![$($name as &dyn KeyArg),+]
            }
        }
    };
}

impl_key_args_tuple!(A);
impl_key_args_tuple!(A, B);
impl_key_args_tuple!(A, B, C);
impl_key_args_tuple!(A, B, C, D);

#[cfg(test)]
mod tests {
    use super::*;

    struct Lookup {
        abbreviation: &'static str,
        strict: bool,
        year: u32,
    }

    impl KeyArgs for Lookup {
        fn positional(&self) -> Vec<&dyn KeyArg> {
            vec![&self.abbreviation as &dyn KeyArg]
        }

        fn named(&self) -> Vec<(&str, &dyn KeyArg)> {
            vec![
                ("year", &self.year as &dyn KeyArg),
                ("strict", &self.strict as &dyn KeyArg),
            ]
        }
    }

    #[test]
    fn test_single_int_matches_python_tuple_form() {
        let key = CacheKey::for_args("get_state_data", &(48,)).unwrap();
        assert_eq!(key.as_str(), "get_state_data(48,){}");
    }

    #[test]
    fn test_multiple_args_in_call_order() {
        let key = CacheKey::for_args("get_awards_data", &(48, 2019)).unwrap();
        assert_eq!(key.as_str(), "get_awards_data(48, 2019){}");

        let swapped = CacheKey::for_args("get_awards_data", &(2019, 48)).unwrap();
        assert_ne!(key, swapped);
    }

    #[test]
    fn test_no_args() {
        let key = CacheKey::for_args("list_states", &()).unwrap();
        assert_eq!(key.as_str(), "list_states(){}");
    }

    #[test]
    fn test_string_arg_is_quoted() {
        let key = CacheKey::for_args("get_toptier_code", &("NASA",)).unwrap();
        assert_eq!(key.as_str(), "get_toptier_code('NASA',){}");
    }

    #[test]
    fn test_string_escaping_keeps_keys_distinct() {
        let a = CacheKey::for_args("op", &("a', 'b",)).unwrap();
        let b = CacheKey::for_args("op", &("a", "b")).unwrap();
        assert_ne!(a, b);

        let quoted = CacheKey::for_args("op", &("it's",)).unwrap();
        assert_eq!(quoted.as_str(), "op(\"it's\",){}");

        let both = CacheKey::for_args("op", &("it's \"x\"",)).unwrap();
        assert_eq!(both.as_str(), "op('it\\'s \"x\"',){}");

        let control = CacheKey::for_args("op", &("a\u{1}\\",)).unwrap();
        assert_eq!(control.as_str(), "op('a\\x01\\\\',){}");
    }

    #[test]
    fn test_string_and_int_of_same_text_differ() {
        let number = CacheKey::for_args("op", &(48,)).unwrap();
        let text = CacheKey::for_args("op", &("48",)).unwrap();
        assert_ne!(number, text);
    }

    #[test]
    fn test_operation_identity_is_part_of_key() {
        let a = CacheKey::for_args("get_state_data", &(48,)).unwrap();
        let b = CacheKey::for_args("get_awards_data", &(48,)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_named_args_sorted_by_name() {
        let key = CacheKey::for_args(
            "lookup",
            &Lookup {
                abbreviation: "NASA",
                strict: true,
                year: 2024,
            },
        )
        .unwrap();
        assert_eq!(
            key.as_str(),
            "lookup('NASA',){'strict': True, 'year': 2024}"
        );
    }

    #[test]
    fn test_named_arg_order_does_not_change_key() {
        let year = 2024u32;
        let strict = false;
        let forward = CacheKey::encode(
            "op",
            &[],
            &[("year", &year as &dyn KeyArg), ("strict", &strict as &dyn KeyArg)],
        )
        .unwrap();
        let backward = CacheKey::encode(
            "op",
            &[],
            &[("strict", &strict as &dyn KeyArg), ("year", &year as &dyn KeyArg)],
        )
        .unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_duplicate_named_arg_rejected() {
        let err = CacheKey::encode(
            "op",
            &[],
            &[("year", &1u32 as &dyn KeyArg), ("year", &2u32 as &dyn KeyArg)],
        )
        .unwrap_err();
        assert!(matches!(err, CacheError::UnencodableArgument { .. }));
    }

    #[test]
    fn test_non_finite_float_rejected() {
        let err = CacheKey::for_args("op", &(f64::NAN,)).unwrap_err();
        assert!(matches!(err, CacheError::UnencodableArgument { .. }));
        assert!(err.to_string().contains("op"));

        let nested = CacheKey::for_args("op", &(vec![1.0, f64::INFINITY],)).unwrap_err();
        assert!(matches!(nested, CacheError::UnencodableArgument { .. }));
    }

    #[test]
    fn test_finite_float_is_stable() {
        let a = CacheKey::for_args("op", &(1.5f64,)).unwrap();
        let b = CacheKey::for_args("op", &(1.5f64,)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "op(1.5,){}");
    }

    #[test]
    fn test_collections_and_options() {
        let mut filters = BTreeMap::new();
        filters.insert("type".to_string(), "grants".to_string());
        filters.insert("agency".to_string(), "NASA".to_string());

        let key = CacheKey::for_args("op", &(vec![1, 2], Some(3), None::<u32>, filters)).unwrap();
        assert_eq!(
            key.as_str(),
            "op([1, 2], 3, None, {'agency': 'NASA', 'type': 'grants'}){}"
        );
    }

    #[test]
    fn test_nested_none_rejected() {
        let err = CacheKey::for_args("op", &(Some(None::<u32>),)).unwrap_err();
        assert!(matches!(err, CacheError::UnencodableArgument { .. }));

        let outer = CacheKey::for_args("op", &(None::<Option<u32>>,)).unwrap();
        let inner = CacheKey::for_args("op", &(Some(Some(7u32)),)).unwrap();
        assert_eq!(outer.as_str(), "op(None,){}");
        assert_eq!(inner.as_str(), "op(7,){}");
    }

    #[test]
    fn test_bad_operation_identifier_rejected() {
        assert!(CacheKey::for_args("", &(1,)).is_err());
        assert!(CacheKey::for_args("op(", &(1,)).is_err());
    }
}
