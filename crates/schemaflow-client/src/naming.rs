//! Subject naming strategies
//!
//! A strategy maps a payload's type name and the target format to the
//! registry subject its schema is registered under.

use std::fmt;

/// Namespace-qualified name of a payload type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    namespace: Option<String>,
    name: String,
}

impl TypeName {
    pub fn new(namespace: Option<&str>, name: &str) -> Self {
        Self {
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            name: name.to_string(),
        }
    }

    /// Split a dotted full name (`example.avro.User`) at its last dot
    pub fn from_full_name(full_name: &str) -> Self {
        match full_name.rsplit_once('.') {
            Some((namespace, name)) => Self::new(Some(namespace), name),
            None => Self::new(None, full_name),
        }
    }

    /// Name of the Rust type `T`: module path as dotted namespace, generic
    /// arguments dropped.
    pub fn of<T: ?Sized>() -> Self {
        let path = std::any::type_name::<T>();
        let path = path.trim_start_matches('&');
        let path = path.split('<').next().unwrap_or(path);
        match path.rsplit_once("::") {
            Some((module, name)) => Self::new(Some(&module.replace("::", ".")), name),
            None => Self::new(None, path),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}.{}", namespace, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// Maps (type name, format) to a registry subject
pub trait SubjectNamingStrategy: Send + Sync + fmt::Debug {
    fn subject(&self, type_name: &TypeName, format: &str) -> String;
}

/// `User1` becomes `user1`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSubjectNamingStrategy;

impl SubjectNamingStrategy for DefaultSubjectNamingStrategy {
    fn subject(&self, type_name: &TypeName, _format: &str) -> String {
        type_name.name().to_lowercase()
    }
}

/// `example.avro.User1` stays `example.avro.User1`
#[derive(Debug, Clone, Copy, Default)]
pub struct QualifiedSubjectNamingStrategy;

impl SubjectNamingStrategy for QualifiedSubjectNamingStrategy {
    fn subject(&self, type_name: &TypeName, _format: &str) -> String {
        type_name.full_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct User1;
    struct Wrapper<T>(T);

    #[test]
    fn test_type_name_of_rust_type() {
        let name = TypeName::of::<User1>();
        assert_eq!(name.name(), "User1");
        assert_eq!(name.namespace(), Some("schemaflow_client.naming.tests"));

        let generic = TypeName::of::<Wrapper<String>>();
        assert_eq!(generic.name(), "Wrapper");

        assert_eq!(TypeName::of::<i32>().full_name(), "i32");
    }

    #[test]
    fn test_from_full_name() {
        let name = TypeName::from_full_name("example.avro.User");
        assert_eq!(name.namespace(), Some("example.avro"));
        assert_eq!(name.name(), "User");
        assert_eq!(name.to_string(), "example.avro.User");

        assert_eq!(TypeName::from_full_name("User").namespace(), None);
    }

    #[test]
    fn test_default_strategy() {
        let name = TypeName::from_full_name("example.avro.User1");
        assert_eq!(DefaultSubjectNamingStrategy.subject(&name, "avro"), "user1");
    }

    #[test]
    fn test_qualified_strategy() {
        let name = TypeName::from_full_name("example.avro.User1");
        assert_eq!(
            QualifiedSubjectNamingStrategy.subject(&name, "avro"),
            "example.avro.User1"
        );
    }
}
