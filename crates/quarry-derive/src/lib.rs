//! Derive macro for quarry's `Model` trait.
//!
//! Generates the per-type field table and value plumbing that the schema
//! registry, executor, and row binder consume:
//!
//! ```ignore
//! #[derive(Debug, Default, Clone, Model)]
//! struct User {
//!     #[orm(id)]
//!     id: i64,
//!     name: String,
//!     #[orm(column = "years_old")]
//!     age: i64,
//!     #[orm(skip)]
//!     cached_display: String,
//! }
//! ```
//!
//! # Field attributes
//!
//! - `#[orm(column = "...")]`: override the derived column name.
//! - `#[orm(skip)]`: exclude the field from persistence entirely.
//! - `#[orm(id)]`: mark the auto-generated key. The field receives the
//!   driver-reported insert id after `create`, and is omitted from INSERT
//!   while it still holds its `Default` value so the store generates it.
//!   An id outside the field type's range is skipped, not truncated.
//!
//! The deriving struct must implement `Default` (fresh rows are built from
//! it during binding) and its fields must implement `Clone`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr};

#[proc_macro_derive(Model, attributes(orm))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

struct FieldInfo {
    ident: syn::Ident,
    ty: syn::Type,
    name: String,
    column: Option<String>,
    skip: bool,
    id: bool,
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let ident = &input.ident;
    let name_str = ident.to_string();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            ident,
            "Model can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            ident,
            "Model requires named struct fields",
        ));
    };

    let infos = parse_fields(fields)?;

    let id_fields: Vec<&FieldInfo> = infos.iter().filter(|f| f.id && !f.skip).collect();
    if id_fields.len() > 1 {
        return Err(syn::Error::new_spanned(
            ident,
            "at most one field may be marked #[orm(id)]",
        ));
    }

    let specs = infos.iter().map(|f| {
        let name = &f.name;
        let skip = f.skip;
        let column = match &f.column {
            Some(c) => quote!(::core::option::Option::Some(#c)),
            None => quote!(::core::option::Option::None),
        };
        quote! {
            ::quarry::FieldSpec { name: #name, column: #column, skip: #skip }
        }
    });

    let value_stmts = infos.iter().filter(|f| !f.skip).map(|f| {
        let name = &f.name;
        let field = &f.ident;
        let ty = &f.ty;
        if f.id {
            // Omit the auto-generated key while unset so INSERT leaves the
            // column to the store (partial-insert semantics).
            quote! {
                if self.#field != <#ty as ::core::default::Default>::default() {
                    map.insert(#name, ::quarry::Value::from(self.#field.clone()));
                }
            }
        } else {
            quote! {
                map.insert(#name, ::quarry::Value::from(self.#field.clone()));
            }
        }
    });

    let put_arms = infos.iter().filter(|f| !f.skip).map(|f| {
        let name = &f.name;
        let field = &f.ident;
        quote! {
            #name => {
                self.#field = ::quarry::FromValue::from_value(value)
                    .map_err(|e| ::quarry::Error::bind(#name, e))?;
            }
        }
    });

    let assign_impl = id_fields.first().map(|f| {
        let field = &f.ident;
        let ty = &f.ty;
        // Checked narrowing: an id outside the member's range is skipped
        // (returns false), never truncated.
        quote! {
            fn assign_generated_id(&mut self, id: i64) -> bool {
                match <#ty as ::core::convert::TryFrom<i64>>::try_from(id) {
                    ::core::result::Result::Ok(v) => {
                        self.#field = v;
                        true
                    }
                    ::core::result::Result::Err(_) => false,
                }
            }
        }
    });

    Ok(quote! {
        #[automatically_derived]
        impl ::quarry::Model for #ident {
            const NAME: &'static str = #name_str;

            const FIELDS: &'static [::quarry::FieldSpec] = &[ #(#specs),* ];

            fn values(&self) -> ::std::collections::HashMap<&'static str, ::quarry::Value> {
                let mut map = ::std::collections::HashMap::new();
                #(#value_stmts)*
                map
            }

            fn put(&mut self, field: &str, value: ::quarry::Value) -> ::quarry::Result<()> {
                match field {
                    #(#put_arms)*
                    _ => {}
                }
                Ok(())
            }

            #assign_impl
        }
    })
}

fn parse_fields(fields: &syn::FieldsNamed) -> syn::Result<Vec<FieldInfo>> {
    let mut infos = Vec::new();

    for field in &fields.named {
        let ident = field
            .ident
            .clone()
            .expect("named fields always have an ident");
        let mut info = FieldInfo {
            name: ident.to_string(),
            ident,
            ty: field.ty.clone(),
            column: None,
            skip: false,
            id: false,
        };

        for attr in &field.attrs {
            if !attr.path().is_ident("orm") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    info.skip = true;
                    Ok(())
                } else if meta.path.is_ident("id") {
                    info.id = true;
                    Ok(())
                } else if meta.path.is_ident("column") {
                    let lit: LitStr = meta.value()?.parse()?;
                    info.column = Some(lit.value());
                    Ok(())
                } else {
                    Err(meta.error("expected one of: column = \"...\", skip, id"))
                }
            })?;
        }

        infos.push(info);
    }

    Ok(infos)
}
