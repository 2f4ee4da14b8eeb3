use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr};

pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let type_name = name.to_string();

    let data = match &input.data {
        Data::Enum(data) => data,
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "BindValue can only be derived for enums",
            ));
        }
    };
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            input,
            "BindValue needs at least one variant",
        ));
    }

    let mut idents = Vec::new();
    let mut names = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "BindValue variants cannot carry data",
            ));
        }
        let mut bind_name = variant.ident.to_string();
        for attr in &variant.attrs {
            if attr.path().is_ident("bind") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename") {
                        let s: LitStr = meta.value()?.parse()?;
                        bind_name = s.value();
                        Ok(())
                    } else {
                        Err(meta.error("unknown bind attribute; expected rename"))
                    }
                })?;
            }
        }
        idents.push(variant.ident.clone());
        names.push(bind_name);
    }

    let indices = 0..idents.len();
    let first = &idents[0];

    Ok(quote! {
        impl ::fennec_core::binding::Bindable for #name {
            fn field_type() -> ::fennec_core::binding::FieldType {
                ::fennec_core::binding::FieldType::new(
                    ::fennec_core::binding::FieldKind::Enum {
                        variants: &[#(#names),*],
                    },
                    #type_name,
                )
            }

            fn from_bound(
                value: ::fennec_core::binding::BoundValue,
            ) -> ::std::result::Result<Self, ::fennec_core::error::ConversionError> {
                match value {
                    ::fennec_core::binding::BoundValue::Enum(index) => match index {
                        #(#indices => ::std::result::Result::Ok(#name::#idents),)*
                        other => ::std::result::Result::Err(::fennec_core::error::ConversionError::new(
                            ::std::format!("{} is not a valid value for {}", other, #type_name),
                        )),
                    },
                    other => ::std::result::Result::Err(other.mismatch(#type_name)),
                }
            }

            fn is_default_value(&self) -> bool {
                ::std::matches!(self, #name::#first)
            }
        }
    })
}
