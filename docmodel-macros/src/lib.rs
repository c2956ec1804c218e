//! Procedural macros for the docmodel project.
//!
//! This crate provides compile-time code generation for the docmodel framework.
//!
//! ## `#[model]`
//!
//! Turns a struct whose fields are attribute marker types into a model type:
//!
//! ```ignore
//! use docmodel::prelude::*;
//!
//! #[model]
//! pub struct Audited {
//!     created: UtcDateTime,
//! }
//!
//! #[model(collection = "movies", database = "catalog", extends = Audited)]
//! pub struct Movie {
//!     #[attribute(hash_key)]
//!     movie_id: Text,
//!     #[attribute(default = "CN")]
//!     title: Text,
//!     #[attribute(name = "yr")]
//!     year: Number,
//!     #[attribute(null)]
//!     meta: Json,
//!     languages: List,
//! }
//! ```
//!
//! The struct is rewritten to hold an `AttributeContainer`. The macro implements
//! `HasAttributes` with a lazily built schema (inherited fields first, then the
//! declared ones in order) and generates a typed getter and `set_*` setter per declared
//! field. `Model` is implemented only when a `collection` is given, so types without
//! one serve as abstract bases for `extends`.
//!
//! ### Struct arguments
//!
//! - `collection = "..."` - Collection the model is stored in
//! - `database = "..."` - Database to use instead of the store's default one
//! - `extends = Path` - Model type whose attributes are inherited
//!
//! ### Field arguments (`#[attribute(...)]`)
//!
//! - `hash_key` - Marks the model's hash key; at most one per model
//! - `null` - Marks the attribute as nullable
//! - `name = "..."` - Overrides the stored field name
//! - `default = expr` - Literal default value, converted with `Into<Bson>`
//! - `default_with = path` - Default producer of type `fn() -> Bson`, called per instance

#[allow(unused_extern_crates)]
extern crate self as docmodel_macros;

mod model;

use proc_macro::TokenStream;
use syn::{ItemStruct, parse_macro_input};

use crate::model::{ModelArgs, generate_model};

/// Declares a model type.
///
/// # Errors
///
/// Returns a compile error if:
/// - The struct is generic, a tuple struct or a unit struct
/// - More than one field is marked `hash_key`
/// - A field or struct argument is not recognized
///
/// # Panics
///
/// The generated `schema()` panics on first use if the inherited schema already
/// declares a hash key and the struct declares another one.
#[proc_macro_attribute]
pub fn model(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut model_args = ModelArgs::default();
    let parser = syn::meta::parser(|meta| model_args.parse(meta));
    parse_macro_input!(args with parser);

    let item = parse_macro_input!(input as ItemStruct);

    match generate_model(model_args, item) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
