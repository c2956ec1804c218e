mod common;

use docmodel::{prelude::*, query::IndexSpec};

use common::{Call, Movie, RecordingStore, Review, movie};

#[tokio::test]
async fn save_records_the_object_id() {
    let store = DocumentStore::new(RecordingStore::new());
    let movies = store.models::<Movie>();

    let mut casablanca = movie("m1", 1942);
    let result = movies.save(&mut casablanca).await.unwrap();

    let id = casablanca.object_id().cloned().unwrap();
    assert_eq!(result.inserted_id, id);
    let fetched = movies.get(doc! { "movie_id": "m1" }, None).await.unwrap();

    assert_eq!(fetched.object_id(), Some(&id));
    assert_eq!(fetched.year(), Some(NumberValue::Int(1942)));
    assert_eq!(fetched.title().as_deref(), Some("CN"));
}

#[tokio::test]
async fn update_targets_and_reloads_by_object_id() {
    let store = DocumentStore::new(RecordingStore::new());
    let movies = store.models::<Movie>();

    let mut casablanca = movie("m1", 1942);
    movies.save(&mut casablanca).await.unwrap();
    let id = casablanca.object_id().cloned().unwrap();
    store.backend().clear();

    let result = movies
        .update(&mut casablanca, doc! { "year": 1943 }, UpdateOptions::default())
        .await
        .unwrap();

    assert_eq!(result.modified_count, 1);
    assert_eq!(casablanca.year(), Some(NumberValue::Int(1943)));
    assert_eq!(
        store.backend().calls(),
        vec![
            Call::UpdateOne {
                filter: doc! { "_id": id.clone() },
                update: doc! { "$set": { "year": 1943 } },
                upsert: false,
            },
            Call::FindOne(doc! { "_id": id }),
        ]
    );
}

#[tokio::test]
async fn update_without_reload_leaves_the_instance_alone() {
    let store = DocumentStore::new(RecordingStore::new());
    let movies = store.models::<Movie>();

    let mut casablanca = movie("m1", 1942);
    movies.save(&mut casablanca).await.unwrap();
    store.backend().clear();

    movies
        .update(&mut casablanca, doc! { "year": 1943 }, UpdateOptions::default().reload(false))
        .await
        .unwrap();

    assert_eq!(casablanca.year(), Some(NumberValue::Int(1942)));
    assert_eq!(store.backend().calls().len(), 1);
}

#[tokio::test]
async fn instances_without_identity_never_reach_the_store() {
    let store = DocumentStore::new(RecordingStore::new());
    let movies = store.models::<Movie>();
    let mut empty = Movie::new(doc! {}).unwrap();

    assert!(matches!(
        movies.delete(&empty).await,
        Err(DocumentStoreError::AttributesEmpty { operation: "delete", .. })
    ));
    assert!(matches!(
        movies.update(&mut empty, doc! { "year": 1 }, UpdateOptions::default()).await,
        Err(DocumentStoreError::AttributesEmpty { operation: "update", .. })
    ));
    assert!(matches!(
        movies.increment(&empty, doc! { "views_total": 1 }, false).await,
        Err(DocumentStoreError::AttributesEmpty { operation: "increment", .. })
    ));
    assert!(store.backend().calls().is_empty());
}

#[tokio::test]
async fn unsaved_instances_target_their_constructor_fields() {
    let store = DocumentStore::new(RecordingStore::new());
    let movies = store.models::<Movie>();

    let mut saved = movie("m2", 1999);
    movies.save(&mut saved).await.unwrap();
    store.backend().clear();

    let unsaved = Movie::with_hash_key("m2", doc! {}).unwrap();
    let result = movies.delete(&unsaved).await.unwrap();

    assert_eq!(result.deleted_count, 1);
    assert_eq!(store.backend().calls(), vec![Call::DeleteOne(doc! { "movie_id": "m2" })]);
}

#[tokio::test]
async fn not_found_is_scoped_to_the_model_type() {
    let store = DocumentStore::new(RecordingStore::new());

    let err = store
        .models::<Movie>()
        .get(doc! { "movie_id": "missing" }, None)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(err.is_not_found_for::<Movie>());
    assert!(!err.is_not_found_for::<Review>());
    assert_eq!(err.to_string(), "Movie does not exist");
}

#[tokio::test]
async fn batch_get_fetches_by_hash_key() {
    let store = DocumentStore::new(RecordingStore::new());
    let movies = store.models::<Movie>();

    for (id, year) in [("m1", 1942), ("m2", 1950), ("m3", 1960)] {
        movies.save(&mut movie(id, year)).await.unwrap();
    }
    store.backend().clear();

    assert!(movies.batch_get(vec![], None).await.unwrap().is_empty());
    assert!(store.backend().calls().is_empty());

    let found = movies
        .batch_get(vec!["m1".into(), "m3".into()], None)
        .await
        .unwrap();
    let mut ids = found
        .iter()
        .filter_map(Movie::movie_id)
        .collect::<Vec<_>>();
    ids.sort();

    assert_eq!(ids, vec!["m1", "m3"]);
    assert!(matches!(
        store.models::<Review>().batch_get(vec!["r1".into()], None).await,
        Err(DocumentStoreError::InvalidSchema(_))
    ));
}

#[tokio::test]
async fn query_moves_offset_and_limit_into_cursor_options() {
    let store = DocumentStore::new(RecordingStore::new());
    let movies = store.models::<Movie>();

    for year in 1..=5 {
        movies.save(&mut movie(&format!("m{year}"), year)).await.unwrap();
    }
    store.backend().clear();

    let page = movies
        .query(
            doc! { "title": "CN", "offset": 1, "limit": 2 },
            FindOptions::builder().sort("year", SortDirection::Asc).build(),
        )
        .await
        .unwrap();

    let years = page
        .iter()
        .filter_map(|movie| movie.year().map(|year| year.as_i64()))
        .collect::<Vec<_>>();
    assert_eq!(years, vec![2, 3]);

    match store.backend().calls().as_slice() {
        [Call::Find(filter, options)] => {
            assert_eq!(filter, &doc! { "title": "CN" });
            assert_eq!(options.skip, Some(1));
            assert_eq!(options.limit, Some(2));
        }
        other => panic!("unexpected calls: {other:?}"),
    }

    assert!(matches!(
        movies.query(doc! { "offset": "two" }, FindOptions::default()).await,
        Err(DocumentStoreError::InvalidAttributeValue { .. })
    ));
}

#[tokio::test]
async fn explain_fetches_the_plan_without_changing_results() {
    let store = DocumentStore::new(RecordingStore::new());
    let movies = store.models::<Movie>();
    movies.save(&mut movie("m1", 1942)).await.unwrap();
    store.backend().clear();

    let found = movies
        .find(doc! { "year": 1942 }, FindOptions::builder().explain(true).build())
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert!(store.backend().calls().contains(&Call::Explain(doc! { "year": 1942 })));
}

#[tokio::test]
async fn increment_adds_to_the_stored_value() {
    let store = DocumentStore::new(RecordingStore::new());
    let movies = store.models::<Movie>();

    let mut casablanca = movie("m1", 1942);
    movies.save(&mut casablanca).await.unwrap();

    movies.increment(&casablanca, doc! { "views_total": 2 }, false).await.unwrap();
    movies.increment(&casablanca, doc! { "views_total": 3 }, false).await.unwrap();

    let fetched = movies.get(doc! { "movie_id": "m1" }, None).await.unwrap();
    assert_eq!(fetched.views().map(|views| views.as_i64()), Some(5));
}

#[tokio::test]
async fn unique_indexes_reject_duplicates() {
    let store = DocumentStore::new(RecordingStore::new());
    let movies = store.models::<Movie>();

    let name = movies
        .create_index(IndexSpec::field("movie_id").unique(true))
        .await
        .unwrap();
    assert_eq!(name, "movie_id_1");

    movies.save(&mut movie("m1", 1942)).await.unwrap();

    assert!(matches!(
        movies.save(&mut movie("m1", 1943)).await,
        Err(DocumentStoreError::DuplicateKey(_))
    ));
    assert_eq!(movies.count(doc! {}).await.unwrap(), 1);
}

#[tokio::test]
async fn collection_wide_operations() {
    let store = DocumentStore::new(RecordingStore::new());
    let movies = store.models::<Movie>();

    for (id, year) in [("m1", 1942), ("m2", 1950), ("m3", 1960)] {
        movies.save(&mut movie(id, year)).await.unwrap();
    }

    let counted = movies
        .aggregate(vec![
            doc! { "$match": { "year": { "$gte": 1950 } } },
            doc! { "$count": "total" },
        ])
        .await
        .unwrap();
    assert_eq!(counted, vec![doc! { "total": 2_i64 }]);

    let updated = movies
        .update_many(doc! { "year": { "$lt": 1955 } }, doc! { "$set": { "title": "Classic" } }, false)
        .await
        .unwrap();
    assert_eq!(updated.modified_count, 2);
    assert_eq!(movies.count(doc! { "title": "Classic" }).await.unwrap(), 2);

    let deleted = movies.delete_many(doc! { "title": "Classic" }).await.unwrap();
    assert_eq!(deleted.deleted_count, 2);
    assert_eq!(movies.count(doc! {}).await.unwrap(), 1);
}

#[tokio::test]
async fn models_are_stored_in_their_own_namespace() {
    let store = DocumentStore::new(RecordingStore::new());

    let mut review = Review::new(doc! { "body": "Timeless", "stars": 5 }).unwrap();
    store.models::<Review>().save(&mut review).await.unwrap();

    assert_eq!(store.models::<Review>().count(doc! {}).await.unwrap(), 1);
    assert_eq!(store.models::<Movie>().count(doc! {}).await.unwrap(), 0);
    assert_eq!(
        store.models::<Review>().namespace().database.as_deref(),
        Some("critics")
    );
}
