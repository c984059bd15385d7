//! A small library schema and model used by the runner and the tests.
//!
//! The schema touches every feature the engine distinguishes: enums, each
//! primitive the generator supports, containment both ways, unique
//! references, a property narrowed at runtime, a validation rule, derived
//! and read-only properties, and a `base_` prefixed attribute.

use crate::error::FuzzResult;
use modelfuzz_core::{GraphError, NodeId, PrimitiveKind, TypeId, Value};
use modelfuzz_graph::Graph;
use modelfuzz_registry::{PropertyDecl, Registry, RegistryBuilder};
use std::sync::Arc;

pub fn library_registry() -> FuzzResult<Arc<Registry>> {
    let mut builder = RegistryBuilder::new();
    builder.add_enum("Genre", &["Fiction", "Science", "History", "Poetry"])?;

    builder
        .add_type("Named")
        .abstract_type()
        .property(PropertyDecl::attribute("name", PrimitiveKind::Text).nullable())
        .done()?;

    builder
        .add_type("Library")
        .extends("Named")
        .property(PropertyDecl::containment("books", "Book").many())
        .property(PropertyDecl::containment("members", "Member").many())
        .property(PropertyDecl::reference("featured", "Named"))
        .property(PropertyDecl::attribute("opened", PrimitiveKind::Bool))
        .done()?;

    builder
        .add_type("Book")
        .extends("Named")
        .property(PropertyDecl::enumeration("genre", "Genre"))
        .property(PropertyDecl::attribute("pages", PrimitiveKind::Int))
        .property(PropertyDecl::attribute("rating", PrimitiveKind::Real).nullable())
        .property(PropertyDecl::attribute("base_edition", PrimitiveKind::Int).with_default(Value::Int(1)))
        .property(PropertyDecl::container("library", "Library", "books"))
        .property(PropertyDecl::reference("authors", "Member").many().unique())
        .property(PropertyDecl::attribute("summary", PrimitiveKind::Text).derived())
        .property(PropertyDecl::attribute("catalog_id", PrimitiveKind::Int).readonly())
        .done()?;

    builder
        .add_type("Member")
        .extends("Named")
        .property(PropertyDecl::reference("borrowed", "Book").many().unique())
        .property(PropertyDecl::containment("card", "Card"))
        .done()?;

    builder
        .add_type("Card")
        .property(PropertyDecl::attribute("number", PrimitiveKind::Int))
        .property(PropertyDecl::container("holder", "Member", "card"))
        .done()?;

    Ok(Arc::new(builder.build()?))
}

/// One library with two books, two members with cards, some cross
/// references, `featured` narrowed to books and non-negative page counts.
pub fn library_model() -> FuzzResult<Graph> {
    let registry = library_registry()?;
    let mut graph = Graph::new(Arc::clone(&registry));

    let library_t = type_id(&registry, "Library")?;
    let book_t = type_id(&registry, "Book")?;
    let member_t = type_id(&registry, "Member")?;
    let card_t = type_id(&registry, "Card")?;
    let prop = |type_id: TypeId, name: &str| {
        registry
            .get_type_property(type_id, name)
            .map(|def| def.id)
            .ok_or_else(|| GraphError::InvalidOperation(format!("library schema has no {}", name)))
    };

    graph.restrict_target(prop(library_t, "featured")?, book_t);
    graph.add_validator("non_negative_pages", |_, _, def, value| match value {
        Value::Int(pages) if def.name == "pages" && *pages < 0 => Err(format!("pages must not be negative, got {}", pages)),
        _ => Ok(()),
    });

    let library = graph.add_root(library_t)?;
    graph.set(library, prop(library_t, "name")?, Value::Text("City Library".into()))?;

    let mut books: Vec<NodeId> = Vec::new();
    for (index, title) in ["Dune", "Cosmos"].into_iter().enumerate() {
        let book = graph.create_node(book_t)?;
        graph.insert(library, prop(library_t, "books")?, index, Value::Node(book))?;
        graph.set(book, prop(book_t, "name")?, Value::Text(title.into()))?;
        graph.set(book, prop(book_t, "pages")?, Value::Int(300 + index as i64 * 100))?;
        books.push(book);
    }

    for (index, name) in ["Ada", "Linus"].into_iter().enumerate() {
        let member = graph.create_node(member_t)?;
        graph.insert(library, prop(library_t, "members")?, index, Value::Node(member))?;
        graph.set(member, prop(member_t, "name")?, Value::Text(name.into()))?;

        let card = graph.create_node(card_t)?;
        graph.set(member, prop(member_t, "card")?, Value::Node(card))?;
        graph.set(card, prop(card_t, "number")?, Value::Int(index as i64 + 1))?;

        graph.insert(member, prop(member_t, "borrowed")?, 0, Value::Node(books[index]))?;
        graph.insert(books[index], prop(book_t, "authors")?, 0, Value::Node(member))?;
    }

    graph.set(library, prop(library_t, "featured")?, Value::Node(books[0]))?;
    Ok(graph)
}

fn type_id(registry: &Registry, name: &str) -> Result<TypeId, GraphError> {
    registry
        .get_type_id(name)
        .ok_or_else(|| GraphError::InvalidOperation(format!("library schema has no type {}", name)))
}
