//! Runtime values
//!
//! Collections are shared behind `Arc`: copying a value is cheap, and `===`
//! compares collection identity with [`Value::ref_eq`].

use indexmap::{IndexMap, IndexSet};
use num_bigint::BigInt;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A runtime value
#[derive(Debug, Clone)]
pub enum Value {
    // === Special Values ===
    Unit,
    Null,

    // === Primitive Values ===
    Boolean(bool),
    Integer(i64),
    BigInteger(BigInt),
    Decimal(Decimal),
    Text(String),
    ByteArray(Vec<u8>),
    Rowid(i64),

    // === Definition Values ===
    /// Reference to an entity row
    Entity { entity: Arc<str>, rowid: i64 },
    Enum {
        enum_name: Arc<str>,
        ordinal: usize,
        name: Arc<str>,
    },
    Object(Arc<str>),

    // === Collections ===
    Range { start: i64, end: i64, step: i64 },
    List(Arc<Vec<Value>>),
    Set(Arc<IndexSet<Value>>),
    Map(Arc<IndexMap<Value, Value>>),
    Tuple(Arc<Vec<Value>>),
}

impl Value {
    // === Constructors ===

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Self::List(Arc::new(items))
    }

    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Set(Arc::new(items.into_iter().collect()))
    }

    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Self::Map(Arc::new(entries.into_iter().collect()))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Self::Tuple(Arc::new(items))
    }

    pub fn entity(entity: &str, rowid: i64) -> Self {
        Self::Entity {
            entity: Arc::from(entity),
            rowid,
        }
    }

    pub fn enum_value(enum_name: &str, ordinal: usize, name: &str) -> Self {
        Self::Enum {
            enum_name: Arc::from(enum_name),
            ordinal,
            name: Arc::from(name),
        }
    }

    // === Accessors ===

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Self::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Elements produced when iterating; maps yield `(key, value)` tuples
    pub fn elements(&self) -> Option<Vec<Value>> {
        match self {
            Self::List(items) => Some(items.to_vec()),
            Self::Set(items) => Some(items.iter().cloned().collect()),
            Self::Map(entries) => Some(
                entries
                    .iter()
                    .map(|(k, v)| Value::tuple(vec![k.clone(), v.clone()]))
                    .collect(),
            ),
            Self::Range { start, end, step } => Some(range_values(*start, *end, *step)),
            _ => None,
        }
    }

    /// Membership test: list/set elements, map keys, range points
    pub fn contains(&self, item: &Value) -> Option<bool> {
        match self {
            Self::List(items) => Some(items.contains(item)),
            Self::Set(items) => Some(items.contains(item)),
            Self::Map(entries) => Some(entries.contains_key(item)),
            Self::Range { start, end, step } => {
                let x = item.as_integer()?;
                if *step == 0 {
                    return Some(false);
                }
                let in_bounds = if *step > 0 {
                    *start <= x && x < *end
                } else {
                    *end < x && x <= *start
                };
                Some(in_bounds && (x - start) % step == 0)
            }
            _ => None,
        }
    }

    /// Number of elements of a collection
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::List(items) => Some(items.len()),
            Self::Set(items) => Some(items.len()),
            Self::Map(entries) => Some(entries.len()),
            _ => None,
        }
    }

    /// Identity comparison used by `===`
    pub fn ref_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::List(a), Self::List(b)) => Arc::ptr_eq(a, b),
            (Self::Set(a), Self::Set(b)) => Arc::ptr_eq(a, b),
            (Self::Map(a), Self::Map(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Compare two values of the same type; `null` sorts first
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, Self::Null) => Some(Ordering::Equal),
            (Self::Null, _) => Some(Ordering::Less),
            (_, Self::Null) => Some(Ordering::Greater),
            (Self::Unit, Self::Unit) => Some(Ordering::Equal),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::BigInteger(a), Self::BigInteger(b)) => Some(a.cmp(b)),
            (Self::Decimal(a), Self::Decimal(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::ByteArray(a), Self::ByteArray(b)) => Some(a.cmp(b)),
            (Self::Rowid(a), Self::Rowid(b)) => Some(a.cmp(b)),
            (Self::Entity { rowid: a, .. }, Self::Entity { rowid: b, .. }) => Some(a.cmp(b)),
            (Self::Enum { ordinal: a, .. }, Self::Enum { ordinal: b, .. }) => Some(a.cmp(b)),
            (Self::Tuple(a), Self::Tuple(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        other => return Some(other),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        }
    }

    /// Total order for sorting; incomparable values are treated as equal
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        self.compare(other).unwrap_or(Ordering::Equal)
    }

    /// Canonical to-text conversion used by text concatenation
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

fn range_values(start: i64, end: i64, step: i64) -> Vec<Value> {
    let mut values = Vec::new();
    if step == 0 {
        return values;
    }
    let mut x = start;
    while (step > 0 && x < end) || (step < 0 && x > end) {
        values.push(Value::Integer(x));
        match x.checked_add(step) {
            Some(next) => x = next,
            None => break,
        }
    }
    values
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unit, Self::Unit) | (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::BigInteger(a), Self::BigInteger(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::ByteArray(a), Self::ByteArray(b)) => a == b,
            (Self::Rowid(a), Self::Rowid(b)) => a == b,
            (
                Self::Entity { entity: e1, rowid: r1 },
                Self::Entity { entity: e2, rowid: r2 },
            ) => e1 == e2 && r1 == r2,
            (
                Self::Enum { enum_name: n1, ordinal: o1, .. },
                Self::Enum { enum_name: n2, ordinal: o2, .. },
            ) => n1 == n2 && o1 == o2,
            (Self::Object(a), Self::Object(b)) => a == b,
            (
                Self::Range { start: s1, end: e1, step: p1 },
                Self::Range { start: s2, end: e2, step: p2 },
            ) => s1 == s2 && e1 == e2 && p1 == p2,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Set(a), Self::Set(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Tuple(a), Self::Tuple(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Unit | Self::Null => {}
            Self::Boolean(b) => b.hash(state),
            Self::Integer(i) | Self::Rowid(i) => i.hash(state),
            Self::BigInteger(i) => i.hash(state),
            Self::Decimal(d) => d.normalize().hash(state),
            Self::Text(s) => s.hash(state),
            Self::ByteArray(b) => b.hash(state),
            Self::Entity { entity, rowid } => {
                entity.hash(state);
                rowid.hash(state);
            }
            Self::Enum { enum_name, ordinal, .. } => {
                enum_name.hash(state);
                ordinal.hash(state);
            }
            Self::Object(name) => name.hash(state),
            Self::Range { start, end, step } => {
                start.hash(state);
                end.hash(state);
                step.hash(state);
            }
            Self::List(items) | Self::Tuple(items) => items.hash(state),
            // Set and map equality ignores order, so only the size is hashed
            Self::Set(items) => items.len().hash(state),
            Self::Map(entries) => entries.len().hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "unit"),
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) | Self::Rowid(i) => write!(f, "{i}"),
            Self::BigInteger(i) => write!(f, "{i}"),
            Self::Decimal(d) => write!(f, "{}", d.normalize()),
            Self::Text(s) => write!(f, "{s}"),
            Self::ByteArray(bytes) => {
                write!(f, "0x")?;
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Self::Entity { entity, rowid } => write!(f, "{entity}[{rowid}]"),
            Self::Enum { name, .. } => write!(f, "{name}"),
            Self::Object(name) => write!(f, "{name}"),
            Self::Range { start, end, step } => write!(f, "range({start},{end},{step})"),
            Self::List(items) => write_seq(f, "[", items.iter(), "]"),
            Self::Set(items) => write_seq(f, "[", items.iter(), "]"),
            Self::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                write!(f, "}}")
            }
            Self::Tuple(items) => write_seq(f, "(", items.iter(), ")"),
        }
    }
}

fn write_seq<'a>(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    items: impl Iterator<Item = &'a Value>,
    close: &str,
) -> fmt::Result {
    write!(f, "{open}")?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "{close}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_eq_is_identity() {
        let a = Value::list(vec![Value::Integer(1)]);
        let b = a.clone();
        let c = Value::list(vec![Value::Integer(1)]);
        assert!(a.ref_eq(&b));
        assert!(!a.ref_eq(&c));
        assert_eq!(a, c);
    }

    #[test]
    fn test_null_sorts_first() {
        assert_eq!(Value::Null.compare(&Value::Integer(-5)), Some(Ordering::Less));
        assert_eq!(Value::Integer(1).compare(&Value::text("a")), None);
    }

    #[test]
    fn test_range_contains() {
        let r = Value::Range { start: 0, end: 10, step: 3 };
        assert_eq!(r.contains(&Value::Integer(9)), Some(true));
        assert_eq!(r.contains(&Value::Integer(10)), Some(false));
        assert_eq!(r.contains(&Value::Integer(4)), Some(false));
        assert_eq!(r.elements().map(|e| e.len()), Some(4));
    }

    #[test]
    fn test_decimal_text_is_normalized() {
        assert_eq!(Value::Decimal(Decimal::new(1500, 3)).to_text(), "1.5");
        assert_eq!(Value::ByteArray(vec![0x0a, 0xff]).to_text(), "0x0aff");
        assert_eq!(Value::entity("user", 7).to_text(), "user[7]");
    }
}
