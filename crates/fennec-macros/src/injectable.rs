use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

enum Resolution {
    Scope,
    Create,
    Default,
}

pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Injectable can only be derived for structs",
            ));
        }
    };

    let (dependencies, construct) = match fields {
        Fields::Unit => (quote! {}, quote! { #name }),
        Fields::Named(named) => {
            let mut dependencies = Vec::new();
            let mut inits = Vec::new();
            for field in &named.named {
                let ident = field.ident.as_ref();
                let ty = &field.ty;
                let mut resolution = Resolution::Scope;
                for attr in &field.attrs {
                    if !attr.path().is_ident("inject") {
                        continue;
                    }
                    attr.parse_nested_meta(|meta| {
                        if meta.path.is_ident("create") {
                            resolution = Resolution::Create;
                            Ok(())
                        } else if meta.path.is_ident("default") {
                            resolution = Resolution::Default;
                            Ok(())
                        } else {
                            Err(meta.error("unknown inject attribute; expected create or default"))
                        }
                    })?;
                }
                match resolution {
                    Resolution::Scope => {
                        dependencies.push(quote! {
                            deps.extend(<#ty as ::fennec_core::di::FromScope>::dependency());
                        });
                        inits.push(quote! {
                            #ident: <#ty as ::fennec_core::di::FromScope>::from_scope(scope)?
                        });
                    }
                    Resolution::Create => inits.push(quote! {
                        #ident: <#ty as ::fennec_core::di::GetOrCreate>::get_or_create(scope)?
                    }),
                    Resolution::Default => inits.push(quote! {
                        #ident: ::core::default::Default::default()
                    }),
                }
            }
            (quote! { #(#dependencies)* }, quote! { #name { #(#inits),* } })
        }
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Injectable can only be derived for structs with named fields or unit structs",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::fennec_core::di::Injectable for #name #ty_generics #where_clause {
            fn dependencies() -> ::std::vec::Vec<::fennec_core::di::Dependency> {
                #[allow(unused_mut)]
                let mut deps = ::std::vec::Vec::new();
                #dependencies
                deps
            }

            #[allow(unused_variables)]
            fn inject(
                scope: &::fennec_core::di::Scope,
            ) -> ::std::result::Result<Self, ::fennec_core::error::ResolveError> {
                ::std::result::Result::Ok(#construct)
            }
        }

        impl #impl_generics ::fennec_core::di::FromScope for #name #ty_generics #where_clause {
            fn from_scope(
                scope: &::fennec_core::di::Scope,
            ) -> ::std::result::Result<Self, ::fennec_core::error::ResolveError> {
                <Self as ::fennec_core::di::Injectable>::inject(scope)
            }
        }
    })
}
