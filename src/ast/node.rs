//! The closed node-kind set and its per-variant payloads.

use serde::{Deserialize, Serialize};

use crate::token::Position;

use super::Ast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefKind {
    Style,
    Element,
    Var,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OriginKind {
    Html,
    Style,
    JavaScript,
    /// A registered `[OriginType]` alias, e.g. `@Vue`.
    Custom(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Delete,
    Insert,
    Replace,
    Use,
    Inherit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectorKind {
    Class(String),
    Id(String),
    Element(String),
    /// The `&` context reference, resolved at codegen time.
    Context,
    PseudoClass(String),
    PseudoElement(String),
    /// A base selector with pseudo suffixes attached, e.g. `&:hover`.
    Compound(Box<SelectorKind>, Box<SelectorKind>),
}

/// A specialization target: a bare name, an indexed tag (`div[1]`), or
/// `*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecTarget {
    Name(String),
    Indexed { tag: String, index: i64 },
    Wildcard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertPosition {
    After,
    Before,
    AtTop,
    AtBottom,
    Replace,
}

/// A specialization operation attached to a Custom entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SpecOp {
    /// Removes a style/var property (by name) or, in an `@Element`
    /// custom, a child (by selector/index/wildcard) — the same op
    /// variant covers both; what a `SpecTarget::Name` means depends on
    /// the owning entity's `DefKind`.
    DeleteProperty(SpecTarget),
    DeleteInheritance(String),
    Insert {
        position: InsertPosition,
        target: SpecTarget,
        subtree: SubtreeData,
    },
    ReplaceElement {
        target: SpecTarget,
        subtree: SubtreeData,
    },
    ModifyProperty(String, String),
}

/// A self-contained fragment of parsed AST, used to carry an `insert`/
/// `replace` subtree without borrowing from the arena that produced it.
#[derive(Debug, Clone)]
pub struct SubtreeData(pub std::sync::Arc<Ast>);

impl Serialize for SubtreeData {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str("<subtree>")
    }
}

impl<'de> Deserialize<'de> for SubtreeData {
    fn deserialize<D: serde::Deserializer<'de>>(_d: D) -> Result<Self, D::Error> {
        Err(serde::de::Error::custom(
            "subtree fragments are not deserializable",
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// Quoted string (`is_literal = true`) or unquoted literal treated
    /// as a string (`is_literal = false`) — the distinction is kept so
    /// later passes can tell a deliberate string from a bare token.
    Text { value: String, is_literal: bool },
    Number(String),
    VarRef {
        group: String,
        name: String,
        default: Option<String>,
    },
    TypedBlockRef(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementData {
    pub tag: String,
    pub self_closing: bool,
    /// Insertion-ordered, deduplicated.
    pub classes: Vec<String>,
    pub id: Option<String>,
    pub has_style: bool,
    pub has_script: bool,
}

impl ElementData {
    pub fn new(tag: String) -> Self {
        let self_closing = crate::token::html::is_self_closing(&tag);
        Self {
            tag,
            self_closing,
            classes: Vec::new(),
            id: None,
            has_style: false,
            has_script: false,
        }
    }

    /// Adds `class` to the set if not already present.
    pub fn add_class(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !self.classes.iter().any(|c| c == &class) {
            self.classes.push(class);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextData {
    pub value: String,
    pub is_literal: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentData {
    /// Only generator comments (`-- …`) become AST nodes; line/block
    /// comments are discarded by the parser.
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefData {
    pub name: String,
    pub kind: DefKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginData {
    pub name: Option<String>,
    pub kind: OriginKind,
    pub raw_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportKind {
    Html,
    Style,
    JavaScript,
    Chtl,
    CJmod,
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectiveKind {
    Template,
    Custom,
    Origin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectiveImport {
    pub kind: SelectiveKind,
    pub type_prefix: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportData {
    pub kind: ImportKind,
    pub logical_path: String,
    pub alias: Option<String>,
    pub selective: Option<SelectiveImport>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigurationData {
    pub name: Option<String>,
    pub options: Vec<(String, String)>,
    pub name_groups: Vec<(String, Vec<String>)>,
    pub origin_types: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceData {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptData {
    pub raw_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeData {
    pub name: String,
    pub value: AttributeValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorData {
    pub kind: SelectorKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyData {
    pub name: String,
    pub value: String,
    pub important: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationData {
    pub kind: OperationKind,
    pub target: String,
}

/// A template/custom use-site, e.g. `@Style
/// B;` inside a style block or `@Element Card;` inside an element
/// body. `group` carries the type-prefix spelling (`"@Style"`,
/// `"@Element"`, `"@Var"`) so the resolver knows which of the six
/// registry maps to search; `inline_ops` holds any `delete`/`insert`/
/// `replace` statements written immediately after this reference at
/// the same use-site, applied on top of the entity's own
/// specialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceData {
    pub group: String,
    pub name: String,
    pub default: Option<String>,
    pub inline_ops: Vec<SpecOp>,
}

/// The closed AST node-kind set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    Text(TextData),
    Comment(CommentData),
    Template(DefData),
    Custom(DefData),
    Origin(OriginData),
    Import(ImportData),
    Configuration(ConfigurationData),
    Namespace(NamespaceData),
    Style,
    Script(ScriptData),
    Operation(OperationData),
    Attribute(AttributeData),
    Selector(SelectorData),
    Property(PropertyData),
    /// A standalone literal value node; property/attribute values
    /// carry their text inline, since substitution works at the string
    /// level, so this variant is only constructed for bare reference
    /// statements that stand in for a whole value.
    Value(String),
    Reference(ReferenceData),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstNode {
    pub position: Position,
    pub kind: NodeKind,
}

impl AstNode {
    pub fn new(kind: NodeKind, position: Position) -> Self {
        Self { position, kind }
    }

    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }
}
