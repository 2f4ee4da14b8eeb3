use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Expr, Fields, Ident, LitStr, Type};

#[derive(Default)]
struct ContainerAttrs {
    json: bool,
    default: bool,
    from_form: bool,
    only: Option<Vec<String>>,
}

enum FieldDefault {
    None,
    Default,
    Expr(Expr),
}

struct BindField {
    ident: Ident,
    ty: Type,
    name: String,
    bind_name: Option<String>,
    never: bool,
    from_form: bool,
    readonly: bool,
    default: FieldDefault,
}

fn container_attrs(input: &DeriveInput) -> syn::Result<ContainerAttrs> {
    let mut attrs = ContainerAttrs::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("bind") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("json") {
                attrs.json = true;
            } else if meta.path.is_ident("default") {
                attrs.default = true;
            } else if meta.path.is_ident("from_form") {
                attrs.from_form = true;
            } else if meta.path.is_ident("only") {
                let mut names = Vec::new();
                meta.parse_nested_meta(|inner| {
                    let ident = inner.path.require_ident()?;
                    names.push(ident.to_string());
                    Ok(())
                })?;
                attrs.only = Some(names);
            } else {
                return Err(meta.error("unknown bind attribute; expected json, default, from_form or only(..)"));
            }
            Ok(())
        })?;
    }
    Ok(attrs)
}

fn bind_field(field: &syn::Field) -> syn::Result<BindField> {
    let ident = match &field.ident {
        Some(ident) => ident.clone(),
        None => return Err(syn::Error::new_spanned(field, "All fields must have names")),
    };
    let mut parsed = BindField {
        name: ident.to_string(),
        ident,
        ty: field.ty.clone(),
        bind_name: None,
        never: false,
        from_form: false,
        readonly: false,
        default: FieldDefault::None,
    };

    for attr in &field.attrs {
        if !attr.path().is_ident("bind") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("never") {
                parsed.never = true;
            } else if meta.path.is_ident("from_form") {
                parsed.from_form = true;
            } else if meta.path.is_ident("readonly") {
                parsed.readonly = true;
            } else if meta.path.is_ident("rename") {
                let s: LitStr = meta.value()?.parse()?;
                parsed.bind_name = Some(s.value());
            } else if meta.path.is_ident("default") {
                if meta.input.peek(syn::Token![=]) {
                    let s: LitStr = meta.value()?.parse()?;
                    parsed.default = FieldDefault::Expr(s.parse()?);
                } else {
                    parsed.default = FieldDefault::Default;
                }
            } else {
                return Err(meta.error(
                    "unknown bind attribute; expected never, from_form, readonly, rename or default",
                ));
            }
            Ok(())
        })?;
    }
    Ok(parsed)
}

pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let type_name = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "BindRequest can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "BindRequest can only be derived for structs with named fields",
            ));
        }
    };

    let container = container_attrs(input)?;
    let fields = named.iter().map(bind_field).collect::<syn::Result<Vec<_>>>()?;

    if let Some(only) = &container.only {
        for allowed in only {
            if !fields.iter().any(|f| &f.name == allowed) {
                return Err(syn::Error::new_spanned(
                    name,
                    format!("only(..) names unknown field '{}'", allowed),
                ));
            }
        }
    }

    // describe()
    let descriptors = fields.iter().map(|f| {
        let field_name = &f.name;
        let ty = &f.ty;
        let field_type = if f.never {
            quote! { ::fennec_core::binding::FieldType::opaque(stringify!(#ty)) }
        } else {
            quote! { <#ty as ::fennec_core::binding::Bindable>::field_type() }
        };
        let mut builder = quote! {
            ::fennec_core::binding::FieldDescriptor::new(#field_name, #field_type)
        };
        if let Some(bind_name) = &f.bind_name {
            builder = quote! { #builder.bind_name(#bind_name) };
        }
        if f.readonly {
            builder = quote! { #builder.readonly() };
        }
        if f.never {
            builder = quote! { #builder.never_bind() };
        }
        if f.from_form {
            builder = quote! { #builder.from_form() };
        }
        quote! { .field(#builder) }
    });
    let allow_only = container.only.as_ref().map(|only| {
        quote! { .allow_only(&[#(#only),*]) }
    });
    let shape_from_form = container.from_form.then(|| quote! { .from_form() });
    let json_body = container.json.then(|| quote! { .json_body() });

    // constructors() / default_instance()
    let (constructors, default_instance) = if container.default {
        (
            quote! { ::std::vec::Vec::new() },
            quote! { ::std::option::Option::Some(<Self as ::core::default::Default>::default()) },
        )
    } else {
        let params = fields.iter().filter(|f| !f.never).map(|f| {
            let field_name = &f.name;
            let ty = &f.ty;
            match f.default {
                FieldDefault::None => quote! {
                    ::fennec_core::binding::ParamDescriptor::new(
                        #field_name,
                        <#ty as ::fennec_core::binding::Bindable>::absent().is_some(),
                    )
                },
                _ => quote! { ::fennec_core::binding::ParamDescriptor::new(#field_name, true) },
            }
        });
        let inits = fields.iter().map(|f| {
            let ident = &f.ident;
            let field_name = &f.name;
            let ty = &f.ty;
            if f.never {
                return quote! { #ident: ::core::default::Default::default() };
            }
            match &f.default {
                FieldDefault::None => quote! { #ident: args.value::<#ty>(#field_name)? },
                FieldDefault::Default => quote! {
                    #ident: args.value_or_else::<#ty>(#field_name, ::core::default::Default::default)?
                },
                FieldDefault::Expr(expr) => quote! {
                    #ident: args.value_or_else::<#ty>(#field_name, || #expr)?
                },
            }
        });
        (
            quote! {
                ::std::vec![::fennec_core::binding::Constructor::new(
                    ::std::vec![#(#params),*],
                    |args: &::fennec_core::binding::ConstructorArgs<'_>| {
                        ::std::result::Result::Ok(Self { #(#inits),* })
                    },
                )]
            },
            quote! { ::std::option::Option::None },
        )
    };

    // assign()
    let assign_arms = fields.iter().filter(|f| !f.never && !f.readonly).map(|f| {
        let ident = &f.ident;
        let field_name = &f.name;
        let ty = &f.ty;
        quote! {
            #field_name => {
                self.#ident = <#ty as ::fennec_core::binding::Bindable>::from_bound(value)?;
                ::std::result::Result::Ok(())
            }
        }
    });

    // is_field_default()
    let default_arms = fields.iter().filter(|f| !f.never).map(|f| {
        let ident = &f.ident;
        let field_name = &f.name;
        let ty = &f.ty;
        quote! {
            #field_name => <#ty as ::fennec_core::binding::Bindable>::is_default_value(&self.#ident)
        }
    });

    let decode_body = if container.json {
        quote! {
            fn decode_body(
                body: &[u8],
            ) -> ::std::option::Option<::std::result::Result<Self, ::fennec_core::__private::serde_json::Error>> {
                ::std::option::Option::Some(::fennec_core::__private::serde_json::from_slice::<Self>(body))
            }
        }
    } else {
        quote! {}
    };

    Ok(quote! {
        impl #impl_generics ::fennec_core::binding::RequestShape for #name #ty_generics #where_clause {
            fn describe() -> ::fennec_core::binding::ShapeDescriptor {
                ::fennec_core::binding::ShapeDescriptor::new(#type_name)
                    #(#descriptors)*
                    #allow_only
                    #shape_from_form
                    #json_body
            }

            fn constructors() -> ::std::vec::Vec<::fennec_core::binding::Constructor<Self>> {
                #constructors
            }

            fn default_instance() -> ::std::option::Option<Self> {
                #default_instance
            }

            #[allow(unreachable_code, unused_variables)]
            fn assign(
                &mut self,
                field: &str,
                value: ::fennec_core::binding::BoundValue,
            ) -> ::std::result::Result<(), ::fennec_core::error::ConversionError> {
                match field {
                    #(#assign_arms)*
                    _ => ::std::result::Result::Ok(()),
                }
            }

            fn is_field_default(&self, field: &str) -> bool {
                match field {
                    #(#default_arms,)*
                    _ => false,
                }
            }

            #decode_body
        }
    })
}
