//! Best-effort static types read from TypeScript annotations.
//!
//! Types are kept as a small structural tree. Names are resolved later
//! against the binding index, so a `TypeRef::Named` here may end up as a
//! class, an enum, a type alias, a generic parameter or nothing at all.

use swc_ecma_ast::{
    TsEntityName, TsKeywordTypeKind, TsLit, TsType, TsTypeAnn, TsTypeOperatorOp,
    TsUnionOrIntersectionType,
};

use crate::parser::ParsedFile;

/// Literal types keep only what decides truthiness.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralType {
    Bool(bool),
    /// `true` when the string is non-empty.
    Str(bool),
    /// `true` when the number is non-zero.
    Num(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Any,
    Unknown,
    Never,
    Void,
    Undefined,
    Null,
    Boolean,
    String,
    Number,
    Object,
    Literal(LiteralType),
    Named(String),
    /// `typeof value` in a type position.
    Query(String),
    /// `Promise<T>` and `PromiseLike<T>`, kept so `await` can unwrap them.
    Promise(Box<TypeRef>),
    /// An enum after name resolution: the literal type of every member.
    Enum(Vec<LiteralType>),
    Union(Vec<TypeRef>),
    Intersection(Vec<TypeRef>),
}

impl TypeRef {
    pub fn from_ann(ann: &TsTypeAnn, file: &ParsedFile) -> Self {
        Self::from_ts(&ann.type_ann, file)
    }

    pub fn from_ts(ty: &TsType, file: &ParsedFile) -> Self {
        match ty {
            TsType::TsKeywordType(keyword) => match keyword.kind {
                TsKeywordTypeKind::TsAnyKeyword => TypeRef::Any,
                TsKeywordTypeKind::TsUnknownKeyword => TypeRef::Unknown,
                TsKeywordTypeKind::TsNumberKeyword | TsKeywordTypeKind::TsBigIntKeyword => {
                    TypeRef::Number
                }
                TsKeywordTypeKind::TsStringKeyword => TypeRef::String,
                TsKeywordTypeKind::TsBooleanKeyword => TypeRef::Boolean,
                TsKeywordTypeKind::TsVoidKeyword => TypeRef::Void,
                TsKeywordTypeKind::TsUndefinedKeyword => TypeRef::Undefined,
                TsKeywordTypeKind::TsNullKeyword => TypeRef::Null,
                TsKeywordTypeKind::TsNeverKeyword => TypeRef::Never,
                TsKeywordTypeKind::TsObjectKeyword | TsKeywordTypeKind::TsSymbolKeyword => {
                    TypeRef::Object
                }
                TsKeywordTypeKind::TsIntrinsicKeyword => TypeRef::Any,
            },
            TsType::TsTypeRef(reference) => {
                let name = entity_name(&reference.type_name);
                let payload = reference
                    .type_params
                    .as_ref()
                    .and_then(|args| args.params.first());
                match (name.as_str(), payload) {
                    ("Promise" | "PromiseLike", Some(payload)) => {
                        TypeRef::Promise(Box::new(Self::from_ts(payload, file)))
                    }
                    _ => TypeRef::Named(name),
                }
            }
            TsType::TsTypeQuery(query) => match &query.expr_name {
                swc_ecma_ast::TsTypeQueryExpr::TsEntityName(name) => {
                    TypeRef::Query(entity_name(name))
                }
                _ => TypeRef::Any,
            },
            TsType::TsLitType(lit) => match &lit.lit {
                TsLit::Bool(b) => TypeRef::Literal(LiteralType::Bool(b.value)),
                TsLit::Number(n) => TypeRef::Literal(LiteralType::Num(n.value != 0.0)),
                TsLit::Str(s) => {
                    let non_empty = file
                        .span_text(s.span)
                        .map(|raw| raw.len() > 2)
                        .unwrap_or(true);
                    TypeRef::Literal(LiteralType::Str(non_empty))
                }
                TsLit::BigInt(b) => {
                    let non_zero = file
                        .span_text(b.span)
                        .map(|raw| !is_zero_bigint(raw))
                        .unwrap_or(true);
                    TypeRef::Literal(LiteralType::Num(non_zero))
                }
                TsLit::Tpl(_) => TypeRef::String,
            },
            TsType::TsUnionOrIntersectionType(TsUnionOrIntersectionType::TsUnionType(union)) => {
                TypeRef::union(union.types.iter().map(|t| Self::from_ts(t, file)).collect())
            }
            TsType::TsUnionOrIntersectionType(TsUnionOrIntersectionType::TsIntersectionType(
                intersection,
            )) => TypeRef::Intersection(
                intersection
                    .types
                    .iter()
                    .map(|t| Self::from_ts(t, file))
                    .collect(),
            ),
            TsType::TsParenthesizedType(paren) => Self::from_ts(&paren.type_ann, file),
            TsType::TsOptionalType(optional) => {
                Self::from_ts(&optional.type_ann, file).or_undefined()
            }
            TsType::TsTypeOperator(operator) => match operator.op {
                TsTypeOperatorOp::KeyOf => TypeRef::union(vec![TypeRef::String, TypeRef::Number]),
                TsTypeOperatorOp::ReadOnly => Self::from_ts(&operator.type_ann, file),
                TsTypeOperatorOp::Unique => TypeRef::Object,
            },
            TsType::TsConditionalType(conditional) => TypeRef::union(vec![
                Self::from_ts(&conditional.true_type, file),
                Self::from_ts(&conditional.false_type, file),
            ]),
            TsType::TsTypePredicate(_) => TypeRef::Boolean,
            TsType::TsThisType(_)
            | TsType::TsFnOrConstructorType(_)
            | TsType::TsTypeLit(_)
            | TsType::TsArrayType(_)
            | TsType::TsTupleType(_)
            | TsType::TsRestType(_)
            | TsType::TsMappedType(_)
            | TsType::TsImportType(_) => TypeRef::Object,
            TsType::TsInferType(_) | TsType::TsIndexedAccessType(_) => TypeRef::Any,
        }
    }

    /// Builds a union, flattening nested unions and collapsing single members.
    pub fn union(members: Vec<TypeRef>) -> Self {
        let mut flat: Vec<TypeRef> = Vec::with_capacity(members.len());
        let nested = members.into_iter().flat_map(|member| match member {
            TypeRef::Union(inner) => inner,
            other => vec![other],
        });
        for member in nested {
            if member != TypeRef::Never && !flat.contains(&member) {
                flat.push(member);
            }
        }
        match flat.len() {
            0 => TypeRef::Never,
            1 => flat.pop().unwrap_or(TypeRef::Never),
            _ => TypeRef::Union(flat),
        }
    }

    pub fn or_undefined(self) -> Self {
        TypeRef::union(vec![self, TypeRef::Undefined])
    }

    /// The type with `null`, `undefined` and `void` members removed.
    pub fn non_nullable(self) -> Self {
        match self {
            TypeRef::Union(members) => TypeRef::union(
                members
                    .into_iter()
                    .filter(|m| !m.is_nullish())
                    .collect(),
            ),
            TypeRef::Null | TypeRef::Undefined | TypeRef::Void => TypeRef::Never,
            other => other,
        }
    }

    /// Literal types widened to their primitive, as `let` declarations do.
    pub fn widened(self) -> Self {
        match self {
            TypeRef::Literal(LiteralType::Bool(_)) => TypeRef::Boolean,
            TypeRef::Literal(LiteralType::Str(_)) => TypeRef::String,
            TypeRef::Literal(LiteralType::Num(_)) => TypeRef::Number,
            TypeRef::Union(members) => {
                TypeRef::union(members.into_iter().map(TypeRef::widened).collect())
            }
            other => other,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, TypeRef::Null | TypeRef::Undefined | TypeRef::Void)
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, TypeRef::Any | TypeRef::Unknown)
    }
}

pub fn entity_name(name: &TsEntityName) -> String {
    match name {
        TsEntityName::Ident(ident) => ident.sym.to_string(),
        TsEntityName::TsQualifiedName(qualified) => {
            format!("{}.{}", entity_name(&qualified.left), qualified.right.sym)
        }
    }
}

/// Leftmost identifier of a possibly qualified name, the part that is a binding.
pub fn entity_root(name: &TsEntityName) -> (&str, swc_common::Span) {
    match name {
        TsEntityName::Ident(ident) => (ident.sym.as_str(), ident.span),
        TsEntityName::TsQualifiedName(qualified) => entity_root(&qualified.left),
    }
}

fn is_zero_bigint(raw: &str) -> bool {
    raw.trim_end_matches('n')
        .trim_start_matches("0x")
        .trim_start_matches("0b")
        .trim_start_matches("0o")
        .chars()
        .all(|c| c == '0' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_ecma_ast::{Decl, ModuleItem, Stmt};

    fn alias_type(code: &str) -> TypeRef {
        let file = ParsedFile::from_source("types.ts", code);
        let module = file.module().expect("module");
        let alias = match &module.body[0] {
            ModuleItem::Stmt(Stmt::Decl(Decl::TsTypeAlias(alias))) => alias,
            other => panic!("expected type alias, got {:?}", other),
        };
        TypeRef::from_ts(&alias.type_ann, &file)
    }

    #[test]
    fn keyword_types_map_to_primitives() {
        assert_eq!(alias_type("type T = string;"), TypeRef::String);
        assert_eq!(alias_type("type T = bigint;"), TypeRef::Number);
        assert_eq!(alias_type("type T = unknown;"), TypeRef::Unknown);
        assert_eq!(alias_type("type T = symbol;"), TypeRef::Object);
    }

    #[test]
    fn union_flattens_and_keeps_nullish_members() {
        let ty = alias_type("type T = (Foo | null) | undefined;");

        assert_eq!(
            ty,
            TypeRef::Union(vec![
                TypeRef::Named("Foo".into()),
                TypeRef::Null,
                TypeRef::Undefined
            ])
        );
        assert_eq!(ty.non_nullable(), TypeRef::Named("Foo".into()));
    }

    #[test]
    fn literal_types_record_truthiness() {
        assert_eq!(
            alias_type("type T = '' | 'a';"),
            TypeRef::Union(vec![
                TypeRef::Literal(LiteralType::Str(false)),
                TypeRef::Literal(LiteralType::Str(true))
            ])
        );
        assert_eq!(alias_type("type T = 0;"), TypeRef::Literal(LiteralType::Num(false)));
        assert_eq!(alias_type("type T = 0n;"), TypeRef::Literal(LiteralType::Num(false)));
        assert_eq!(alias_type("type T = true;"), TypeRef::Literal(LiteralType::Bool(true)));
    }

    #[test]
    fn promise_keeps_its_payload() {
        assert_eq!(
            alias_type("type T = Promise<boolean>;"),
            TypeRef::Promise(Box::new(TypeRef::Boolean))
        );
        assert_eq!(alias_type("type T = Promise;"), TypeRef::Named("Promise".into()));
    }

    #[test]
    fn qualified_names_join_with_dots() {
        assert_eq!(alias_type("type T = ns.Inner;"), TypeRef::Named("ns.Inner".into()));
    }

    #[test]
    fn widening_drops_literal_precision() {
        let ty = TypeRef::union(vec![
            TypeRef::Literal(LiteralType::Num(true)),
            TypeRef::Null,
        ]);

        assert_eq!(
            ty.widened(),
            TypeRef::Union(vec![TypeRef::Number, TypeRef::Null])
        );
    }
}
