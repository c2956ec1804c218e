mod common;

use docmodel::{bson::oid::ObjectId, prelude::*};

use common::{Audited, Movie, Review};

#[test]
fn derived_registry_contains_every_inherited_field() {
    let names = Movie::schema().names().collect::<Vec<_>>();

    assert_eq!(
        names,
        vec!["_id", "created", "owner", "movie_id", "title", "year", "languages", "meta", "views_total"]
    );
    assert_eq!(Movie::schema().hash_key(), Some("movie_id"));
    assert_eq!(Audited::schema().names().collect::<Vec<_>>(), vec!["_id", "created", "owner"]);
    assert_eq!(Audited::schema().hash_key(), None);
}

#[test]
fn field_metadata_follows_the_declaration() {
    let schema = Movie::schema();

    assert!(schema.get("meta").unwrap().is_nullable());
    assert!(!schema.get("movie_id").unwrap().is_nullable());
    assert_eq!(schema.get("views_total").unwrap().kind(), AttributeKind::Number);
    assert_eq!(schema.get("created").unwrap().kind(), AttributeKind::UtcDateTime);
    assert!(!schema.contains("views"));
}

#[test]
fn mutable_defaults_are_not_shared() {
    let mut first = Movie::new(doc! {}).unwrap();
    let second = Movie::new(doc! {}).unwrap();

    first.set_languages(vec![Bson::from("English")]);

    assert_eq!(first.languages().map(|languages| languages.len()), Some(1));
    assert_eq!(second.languages(), Some(vec![]));
    assert_eq!(second.meta(), Some(Document::new()));
}

#[test]
fn explicit_values_override_defaults() {
    let fallback = Movie::new(doc! {}).unwrap();
    let explicit = Movie::new(doc! { "title": "Casablanca" }).unwrap();

    assert_eq!(fallback.title().as_deref(), Some("CN"));
    assert_eq!(explicit.title().as_deref(), Some("Casablanca"));
}

#[test]
fn unknown_fields_are_rejected_at_construction() {
    match Movie::new(doc! { "movie_id": "m1", "rating": 5 }) {
        Err(DocumentStoreError::UnknownAttribute { model, attribute }) => {
            assert_eq!(model, "Movie");
            assert_eq!(attribute, "rating");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn accessors_use_the_stored_field_name() {
    let mut movie = Movie::with_hash_key("m1", doc! {}).unwrap();

    movie.set_views(3);
    movie.set_title("");

    assert_eq!(movie.views(), Some(NumberValue::Int(3)));
    assert_eq!(movie.attributes().values().get("views_total"), Some(&Bson::Int64(3)));
    assert_eq!(movie.title(), None);
    assert_eq!(movie.movie_id().as_deref(), Some("m1"));
}

#[test]
fn hash_key_construction_needs_a_hash_key() {
    assert!(matches!(
        Review::with_hash_key("r1", doc! {}),
        Err(DocumentStoreError::InvalidSchema(_))
    ));
}

#[test]
fn namespaces_default_to_the_store_database() {
    let movies = Movie::namespace();
    let reviews = Review::namespace();

    assert_eq!(movies.database, None);
    assert_eq!(movies.collection, "movies");
    assert_eq!(reviews.database.as_deref(), Some("critics"));
    assert_eq!(reviews.to_string(), "critics.reviews");
}

#[test]
fn identity_prefers_the_object_id_over_raw_fields() {
    let id = ObjectId::new();
    let constructed = Movie::new(doc! { "movie_id": "m1", "year": 1942 }).unwrap();
    let fetched = Movie::from_raw(doc! { "_id": id, "movie_id": "m1", "year": 1942 }).unwrap();

    assert_eq!(
        constructed.identity_filter("delete").unwrap(),
        doc! { "movie_id": "m1", "year": 1942 }
    );
    assert_eq!(fetched.identity_filter("delete").unwrap(), doc! { "_id": id });
    assert!(matches!(
        Movie::new(doc! {}).unwrap().identity_filter("delete"),
        Err(DocumentStoreError::AttributesEmpty { operation: "delete", .. })
    ));
}

#[test]
fn copy_keeps_identity_fields() {
    let mut target = Movie::with_hash_key("keep", doc! {}).unwrap();
    let source = Movie::from_raw(doc! { "_id": ObjectId::new(), "movie_id": "other", "year": 2001 }).unwrap();

    target.copy_from(&source);

    assert_eq!(target.movie_id().as_deref(), Some("keep"));
    assert_eq!(target.year(), Some(NumberValue::Int(2001)));
    assert_eq!(target.object_id(), None);
}

#[test]
fn json_view_contains_stored_values() {
    let movie = Movie::with_hash_key("m1", doc! { "year": 1942 }).unwrap();
    let json = movie.to_json().unwrap();

    assert_eq!(json["movie_id"], "m1");
    assert_eq!(json["title"], "CN");
    assert!(json.get("views_total").is_none());
}
