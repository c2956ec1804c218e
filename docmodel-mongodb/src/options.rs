//! Translation of store-neutral options into driver options and commands.

use bson::{Document, doc};
use mongodb::{
    IndexModel,
    options::{FindOneOptions, FindOptions as MongoFindOptions, Hint, IndexOptions},
};
use std::time::Duration;

use docmodel_core::query::{FindOptions, IndexHint, IndexSpec};

fn hint(hint: IndexHint) -> Hint {
    match hint {
        IndexHint::Name(name) => Hint::Name(name),
        IndexHint::Keys(keys) => Hint::Keys(keys),
    }
}

/// Builds the driver's find options. A zero limit means no limit.
pub(crate) fn find_options(options: FindOptions) -> MongoFindOptions {
    let mut find = MongoFindOptions::default();

    find.sort = options.sort;
    find.skip = options.skip.filter(|skip| *skip > 0);
    find.limit = options.limit.filter(|limit| *limit != 0);
    find.projection = options.projection;
    find.hint = options.hint.map(hint);

    find
}

pub(crate) fn find_one_options(projection: Option<Document>) -> FindOneOptions {
    let mut find_one = FindOneOptions::default();
    find_one.projection = projection;

    find_one
}

/// Builds the driver's index model.
pub(crate) fn index_model(index: IndexSpec) -> IndexModel {
    let mut options = IndexOptions::default();

    options.name = index.name;
    options.unique = index.unique.then_some(true);
    options.expire_after = index.expire_after_seconds.map(Duration::from_secs);
    options.partial_filter_expression = index.partial_filter;

    IndexModel::builder()
        .keys(index.keys)
        .options(options)
        .build()
}

/// Builds the `find` command wrapped by `explain`.
pub(crate) fn explain_command(collection: &str, filter: Document, options: FindOptions) -> Document {
    let mut find = doc! { "find": collection, "filter": filter };

    if let Some(sort) = options.sort {
        find.insert("sort", sort);
    }
    if let Some(skip) = options.skip.filter(|skip| *skip > 0) {
        find.insert("skip", skip as i64);
    }
    if let Some(limit) = options.limit.filter(|limit| *limit != 0) {
        find.insert("limit", limit);
    }
    if let Some(projection) = options.projection {
        find.insert("projection", projection);
    }
    match options.hint {
        Some(IndexHint::Name(name)) => {
            find.insert("hint", name);
        }
        Some(IndexHint::Keys(keys)) => {
            find.insert("hint", keys);
        }
        None => {}
    }

    doc! { "explain": find, "verbosity": "queryPlanner" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmodel_core::query::SortDirection;

    #[test]
    fn zero_limits_and_skips_are_dropped() {
        let options = find_options(FindOptions::builder().skip(0).limit(0).build());

        assert_eq!(options.skip, None);
        assert_eq!(options.limit, None);
    }

    #[test]
    fn find_options_carry_every_modifier() {
        let options = find_options(
            FindOptions::builder()
                .sort("year", SortDirection::Desc)
                .skip(5)
                .limit(10)
                .projection(["title"])
                .hint(IndexHint::Name("year_-1".into()))
                .build(),
        );

        assert_eq!(options.sort, Some(doc! { "year": -1 }));
        assert_eq!(options.skip, Some(5));
        assert_eq!(options.limit, Some(10));
        assert_eq!(options.projection, Some(doc! { "title": 1 }));
        assert!(matches!(options.hint, Some(Hint::Name(ref name)) if name == "year_-1"));
    }

    #[test]
    fn explain_wraps_a_find_command() {
        let command = explain_command(
            "movies",
            doc! { "year": 1942 },
            FindOptions::builder().limit(3).build(),
        );

        assert_eq!(
            command,
            doc! {
                "explain": { "find": "movies", "filter": { "year": 1942 }, "limit": 3_i64 },
                "verbosity": "queryPlanner",
            }
        );
    }

    #[test]
    fn index_options_follow_the_definition() {
        let model = index_model(
            IndexSpec::field("created_at")
                .name("ttl")
                .expire_after_seconds(3600),
        );
        let options = model.options.unwrap();

        assert_eq!(model.keys, doc! { "created_at": 1 });
        assert_eq!(options.name.as_deref(), Some("ttl"));
        assert_eq!(options.unique, None);
        assert_eq!(options.expire_after, Some(Duration::from_secs(3600)));
    }
}
