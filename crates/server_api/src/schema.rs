//! Typed schema definition.
//!
//! The schema is assembled from values at startup. SDL text is only ever
//! produced from it (for `GET /graphql/schema`), never parsed into it.

use std::fmt;

use shared::{
    error::ApiError,
    protocol::{POSTS_FIELD, TITLE_FIELD},
    query::{OperationDocument, Selection},
};

const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    NonNull(Box<TypeRef>),
    List(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn non_null(inner: TypeRef) -> Self {
        Self::NonNull(Box::new(inner))
    }

    pub fn list(inner: TypeRef) -> Self {
        Self::List(Box::new(inner))
    }

    /// The named type at the bottom of any list/non-null wrapping.
    pub fn base_name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::NonNull(inner) | Self::List(inner) => inner.base_name(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
            Self::List(inner) => write!(f, "[{inner}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectType {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    query_type: String,
    types: Vec<ObjectType>,
}

impl Schema {
    pub fn new(query_type: impl Into<String>) -> Self {
        Self {
            query_type: query_type.into(),
            types: Vec::new(),
        }
    }

    pub fn with_type(mut self, object: ObjectType) -> Self {
        self.types.push(object);
        self
    }

    /// `type Post { title: String! }` and `type Query { posts: [Post!]! }`.
    pub fn posts() -> Self {
        Self::new("Query")
            .with_type(
                ObjectType::new("Post")
                    .field(TITLE_FIELD, TypeRef::non_null(TypeRef::named("String"))),
            )
            .with_type(ObjectType::new("Query").field(
                POSTS_FIELD,
                TypeRef::non_null(TypeRef::list(TypeRef::non_null(TypeRef::named("Post")))),
            ))
    }

    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        self.types.iter().find(|object| object.name == name)
    }

    pub fn query_type(&self) -> Option<&ObjectType> {
        self.object(&self.query_type)
    }

    pub fn to_sdl(&self) -> String {
        self.types
            .iter()
            .map(|object| {
                let fields: String = object
                    .fields
                    .iter()
                    .map(|field| format!("  {}: {}\n", field.name, field.ty))
                    .collect();
                format!("type {} {{\n{fields}}}\n", object.name)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Checks every selection against the schema before anything is resolved.
    pub fn validate(&self, document: &OperationDocument) -> Result<(), ApiError> {
        let root = self.query_type().ok_or_else(|| {
            ApiError::internal(format!("schema has no '{}' type", self.query_type))
        })?;
        self.validate_selections(root, &document.selections)
    }

    fn validate_selections(
        &self,
        parent: &ObjectType,
        selections: &[Selection],
    ) -> Result<(), ApiError> {
        for selection in selections {
            let field = parent.find_field(&selection.name).ok_or_else(|| {
                ApiError::validation(format!(
                    "Cannot query field \"{}\" on type \"{}\".",
                    selection.name, parent.name
                ))
            })?;

            let base = field.ty.base_name();
            if BUILTIN_SCALARS.contains(&base) {
                if !selection.is_leaf() {
                    return Err(ApiError::validation(format!(
                        "Field \"{}\" must not have a selection since type \"{}\" has no subfields.",
                        field.name, field.ty
                    )));
                }
                continue;
            }

            let object = self.object(base).ok_or_else(|| {
                ApiError::internal(format!("schema references unknown type '{base}'"))
            })?;
            if selection.is_leaf() {
                return Err(ApiError::validation(format!(
                    "Field \"{}\" of type \"{}\" must have a selection of subfields.",
                    field.name, field.ty
                )));
            }
            self.validate_selections(object, &selection.selections)?;
        }
        Ok(())
    }
}
