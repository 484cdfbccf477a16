//! Immutable descriptions of the UI the renderer should produce.
//!
//! An [`Element`] is built once by [`create_element`] and never mutated
//! afterwards. The element type is resolved at construction into a tagged
//! [`ElementType`], so later stages dispatch on the tag instead of inspecting
//! values at runtime.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::RenderError;
use crate::NodeId;

/// Type name carried by text leaves.
pub const TEXT_ELEMENT: &str = "TEXT_ELEMENT";

/// Property holding the value of a text leaf.
pub const NODE_VALUE: &str = "nodeValue";

type RenderFn = dyn Fn(&Props) -> Result<Element, RenderError>;

/// A function component. Two components are the same type only when they
/// share the same render function allocation.
#[derive(Clone)]
pub struct Component {
    name: &'static str,
    render: Rc<RenderFn>,
}

impl Component {
    pub fn new(
        name: &'static str,
        render: impl Fn(&Props) -> Result<Element, RenderError> + 'static,
    ) -> Self {
        Self {
            name,
            render: Rc::new(render),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn render(&self, props: &Props) -> Result<Element, RenderError> {
        (self.render)(props)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.render, &other.render)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ElementType {
    Host(Rc<str>),
    Text,
    Component(Component),
}

impl ElementType {
    pub fn is_component(&self) -> bool {
        matches!(self, ElementType::Component(_))
    }

    /// Human readable name: the tag, `TEXT_ELEMENT`, or the component name.
    pub fn name(&self) -> &str {
        match self {
            ElementType::Host(tag) => tag,
            ElementType::Text => TEXT_ELEMENT,
            ElementType::Component(component) => component.name(),
        }
    }
}

impl From<&str> for ElementType {
    fn from(tag: &str) -> Self {
        ElementType::Host(Rc::from(tag))
    }
}

impl From<String> for ElementType {
    fn from(tag: String) -> Self {
        ElementType::Host(Rc::from(tag))
    }
}

impl From<Component> for ElementType {
    fn from(component: Component) -> Self {
        ElementType::Component(component)
    }
}

impl From<&Component> for ElementType {
    fn from(component: &Component) -> Self {
        ElementType::Component(component.clone())
    }
}

/// Payload handed to listeners when the host fires an event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Event {
    pub event_type: String,
    pub target: Option<NodeId>,
    pub value: Option<String>,
}

impl Event {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Event callback. Equality is identity, so a closure rebuilt on every
/// render always counts as a changed listener.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(&Event)>);

impl Listener {
    pub fn new(callback: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(callback))
    }

    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Rc::as_ptr(&self.0))
    }
}

#[derive(Clone, Debug)]
pub enum PropValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Listener(Listener),
}

/// Floats compare by bit pattern, so a `NaN` attribute equals itself and an
/// unchanged re-render stays free of updates.
impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Int(a), PropValue::Int(b)) => a == b,
            (PropValue::Float(a), PropValue::Float(b)) => a.to_bits() == b.to_bits(),
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Listener(a), PropValue::Listener(b)) => a == b,
            _ => false,
        }
    }
}

impl PropValue {
    pub fn is_listener(&self) -> bool {
        matches!(self, PropValue::Listener(_))
    }

    pub fn as_listener(&self) -> Option<&Listener> {
        match self {
            PropValue::Listener(listener) => Some(listener),
            _ => None,
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(value) => f.write_str(value),
            PropValue::Int(value) => write!(f, "{value}"),
            PropValue::Float(value) => write!(f, "{value}"),
            PropValue::Bool(value) => write!(f, "{value}"),
            PropValue::Listener(listener) => write!(f, "{listener:?}"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(value.into())
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<Listener> for PropValue {
    fn from(listener: Listener) -> Self {
        PropValue::Listener(listener)
    }
}

/// Insertion-ordered property map of an element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attributes(IndexMap<String, PropValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Registers `callback` under `name`, e.g. `on("onClick", ..)`.
    pub fn on(self, name: impl Into<String>, callback: impl Fn(&Event) + 'static) -> Self {
        self.with(name, Listener::new(callback))
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.0.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<PropValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props {
    pub attributes: Attributes,
    pub children: Vec<Element>,
}

impl Props {
    pub fn new(attributes: Attributes, children: Vec<Element>) -> Self {
        Self {
            attributes,
            children,
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.attributes.get(name)
    }

    /// String form of a property, if present.
    pub fn text(&self, name: &str) -> Option<String> {
        self.attributes.get(name).map(ToString::to_string)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    element_type: ElementType,
    props: Rc<Props>,
}

impl Element {
    pub fn element_type(&self) -> &ElementType {
        &self.element_type
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub(crate) fn shared_props(&self) -> Rc<Props> {
        Rc::clone(&self.props)
    }

    pub fn children(&self) -> &[Element] {
        &self.props.children
    }
}

/// One entry of the child list passed to [`create_element`].
#[derive(Clone, Debug, PartialEq)]
pub enum Child {
    Element(Element),
    Text(String),
    Bool(bool),
    Empty,
}

impl Child {
    fn into_element(self) -> Option<Element> {
        match self {
            Child::Element(element) => Some(element),
            Child::Text(text) => Some(create_text_element(text)),
            Child::Bool(_) | Child::Empty => None,
        }
    }
}

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Child::Element(element)
    }
}

impl From<Option<Element>> for Child {
    fn from(element: Option<Element>) -> Self {
        element.map_or(Child::Empty, Child::Element)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_owned())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

impl From<bool> for Child {
    fn from(value: bool) -> Self {
        Child::Bool(value)
    }
}

macro_rules! numeric_child {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Child {
                fn from(value: $ty) -> Self {
                    Child::Text(value.to_string())
                }
            }
        )*
    };
}

numeric_child!(i32, i64, u32, u64, usize, f32, f64);

/// Builds an element from a type, its attributes and its children.
///
/// Strings and numbers become `TEXT_ELEMENT` leaves; booleans and empty
/// children are dropped so `condition.then(..)` style children vanish.
pub fn create_element<C: Into<Child>>(
    element_type: impl Into<ElementType>,
    attributes: Attributes,
    children: impl IntoIterator<Item = C>,
) -> Element {
    let children = children
        .into_iter()
        .filter_map(|child| child.into().into_element())
        .collect();
    Element {
        element_type: element_type.into(),
        props: Rc::new(Props::new(attributes, children)),
    }
}

pub fn create_text_element(value: impl Into<String>) -> Element {
    Element {
        element_type: ElementType::Text,
        props: Rc::new(Props::new(
            Attributes::new().with(NODE_VALUE, value.into()),
            Vec::new(),
        )),
    }
}
