use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Attribute, Error, Expr, Fields, Ident, ItemStruct, LitStr, Path, Result, Type,
    meta::ParseNestedMeta,
};

/// Generated or trait-provided names a field accessor must not shadow.
const RESERVED_FIELDS: &[&str] = &[
    "attributes",
    "attributes_mut",
    "from_attributes",
    "schema",
    "new",
    "object_id",
];

/// Arguments of `#[model(...)]`.
#[derive(Default)]
pub(crate) struct ModelArgs {
    collection: Option<LitStr>,
    database: Option<LitStr>,
    extends: Option<Path>,
}

impl ModelArgs {
    pub(crate) fn parse(&mut self, meta: ParseNestedMeta<'_>) -> Result<()> {
        if meta.path.is_ident("collection") {
            self.collection = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("database") {
            self.database = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("extends") {
            self.extends = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported model argument, expected `collection`, `database` or `extends`"))
        }
    }
}

struct FieldDef {
    ident: Ident,
    ty: Type,
    docs: Vec<Attribute>,
    hash_key: bool,
    nullable: bool,
    rename: Option<LitStr>,
    default: Option<Expr>,
    default_with: Option<Path>,
}

impl FieldDef {
    fn parse(field: syn::Field) -> Result<Self> {
        let ident = field
            .ident
            .ok_or_else(|| Error::new_spanned(&field.ty, "model fields must be named"))?;

        if RESERVED_FIELDS.contains(&ident.to_string().as_str()) {
            return Err(Error::new_spanned(
                &ident,
                format!("`{ident}` is reserved on model types, rename the field and use `#[attribute(name = \"{ident}\")]`"),
            ));
        }

        let mut def = FieldDef {
            ident,
            ty: field.ty,
            docs: Vec::new(),
            hash_key: false,
            nullable: false,
            rename: None,
            default: None,
            default_with: None,
        };

        for attr in field.attrs {
            if attr.path().is_ident("doc") {
                def.docs.push(attr);
                continue;
            }

            if !attr.path().is_ident("attribute") {
                return Err(Error::new_spanned(
                    attr,
                    "only `#[attribute(...)]` and doc comments are supported on model fields",
                ));
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("hash_key") {
                    def.hash_key = true;
                    Ok(())
                } else if meta.path.is_ident("null") {
                    def.nullable = true;
                    Ok(())
                } else if meta.path.is_ident("name") {
                    def.rename = Some(meta.value()?.parse()?);
                    Ok(())
                } else if meta.path.is_ident("default") {
                    def.default = Some(meta.value()?.parse()?);
                    Ok(())
                } else if meta.path.is_ident("default_with") {
                    def.default_with = Some(meta.value()?.parse()?);
                    Ok(())
                } else {
                    Err(meta.error(
                        "unsupported attribute argument, expected `hash_key`, `null`, `name`, `default` or `default_with`",
                    ))
                }
            })?;
        }

        if def.default.is_some() && def.default_with.is_some() {
            return Err(Error::new_spanned(
                &def.ident,
                "`default` and `default_with` are mutually exclusive",
            ));
        }

        Ok(def)
    }

    fn stored_name(&self) -> String {
        match &self.rename {
            Some(name) => name.value(),
            None => self.ident.to_string(),
        }
    }

    fn attribute(&self) -> TokenStream {
        let ty = &self.ty;
        let mut attribute = quote! {
            ::docmodel::attribute::Attribute::new(
                <#ty as ::docmodel::attribute::AttributeType>::KIND
            )
        };

        if self.hash_key {
            attribute = quote! { #attribute.hash_key() };
        }
        if self.nullable {
            attribute = quote! { #attribute.nullable(true) };
        }
        if let Some(name) = &self.rename {
            attribute = quote! { #attribute.named(#name) };
        }
        if let Some(default) = &self.default {
            attribute = quote! { #attribute.default_value(#default) };
        }
        if let Some(factory) = &self.default_with {
            attribute = quote! { #attribute.default_with(#factory) };
        }

        attribute
    }
}

pub(crate) fn generate_model(args: ModelArgs, item: ItemStruct) -> Result<TokenStream> {
    if !item.generics.params.is_empty() || item.generics.where_clause.is_some() {
        return Err(Error::new_spanned(&item.generics, "model types cannot be generic"));
    }

    let fields = match item.fields {
        Fields::Named(named) => named
            .named
            .into_iter()
            .map(FieldDef::parse)
            .collect::<Result<Vec<_>>>()?,
        other => {
            return Err(Error::new_spanned(
                other,
                "models must be declared as structs with named fields",
            ));
        }
    };

    if let Some(second) = fields.iter().filter(|field| field.hash_key).nth(1) {
        return Err(Error::new_spanned(
            &second.ident,
            "a model can declare at most one `hash_key` attribute",
        ));
    }

    let ItemStruct {
        attrs, vis, ident, ..
    } = item;
    let model_name = ident.to_string();

    let base = match &args.extends {
        Some(parent) => quote! {
            .extend(<#parent as ::docmodel::model::HasAttributes>::schema())
        },
        None => quote! { .object_id() },
    };

    let registrations = fields.iter().map(|field| {
        let declared = field.ident.to_string();
        let attribute = field.attribute();

        quote! { .attribute(#declared, #attribute) }
    });

    let accessors = fields.iter().map(|field| {
        let FieldDef { ident, ty, docs, .. } = field;
        let stored = field.stored_name();
        let setter = format_ident!("set_{}", ident);

        quote! {
            #(#docs)*
            #vis fn #ident(&self) -> ::std::option::Option<<#ty as ::docmodel::attribute::AttributeType>::Value> {
                self.attributes.get_typed::<#ty>(#stored)
            }

            #vis fn #setter(
                &mut self,
                value: impl ::std::convert::Into<<#ty as ::docmodel::attribute::AttributeType>::Value>,
            ) {
                self.attributes.set_registered::<#ty>(#stored, value.into());
            }
        }
    });

    let model_impl = args.collection.map(|collection| {
        let database = args.database.map(|database| {
            quote! {
                fn database_name() -> ::std::option::Option<&'static str> {
                    ::std::option::Option::Some(#database)
                }
            }
        });

        quote! {
            impl ::docmodel::model::Model for #ident {
                fn collection_name() -> &'static str {
                    #collection
                }

                #database
            }
        }
    });

    Ok(quote! {
        #(#attrs)*
        #[derive(Debug, Clone, PartialEq)]
        #vis struct #ident {
            attributes: ::docmodel::container::AttributeContainer,
        }

        impl ::docmodel::model::HasAttributes for #ident {
            fn schema() -> &'static ::docmodel::schema::Schema {
                static SCHEMA: ::std::sync::OnceLock<::docmodel::schema::Schema> =
                    ::std::sync::OnceLock::new();

                SCHEMA.get_or_init(|| {
                    ::docmodel::schema::Schema::builder(#model_name)
                        #base
                        #(#registrations)*
                        .build()
                        .unwrap_or_else(|err| panic!("invalid model definition: {err}"))
                })
            }

            fn attributes(&self) -> &::docmodel::container::AttributeContainer {
                &self.attributes
            }

            fn attributes_mut(&mut self) -> &mut ::docmodel::container::AttributeContainer {
                &mut self.attributes
            }

            fn from_attributes(attributes: ::docmodel::container::AttributeContainer) -> Self {
                Self { attributes }
            }
        }

        #model_impl

        impl #ident {
            #(#accessors)*
        }
    })
}
