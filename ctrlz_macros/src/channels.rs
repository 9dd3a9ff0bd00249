//! Channel set macro implementation

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use std::collections::HashSet;
use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    token::Comma,
    Attribute, Error, Ident, Result, Token, Type, Visibility,
};

/// One `Name: Type` entry
pub struct ChannelDef {
    pub attrs: Vec<Attribute>,
    pub name: Ident,
    pub ty: Type,
}

impl Parse for ChannelDef {
    fn parse(input: ParseStream) -> Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let name: Ident = input.parse()?;
        input.parse::<Token![:]>()?;
        let ty: Type = input.parse()?;
        Ok(ChannelDef { attrs, name, ty })
    }
}

/// `[attrs] [vis] SetName { Name: Type, ... }`
pub struct ChannelSetInput {
    pub attrs: Vec<Attribute>,
    pub vis: Visibility,
    pub name: Ident,
    pub channels: Vec<ChannelDef>,
}

impl Parse for ChannelSetInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let vis: Visibility = input.parse()?;
        let name: Ident = input.parse()?;

        let content;
        syn::braced!(content in input);
        let channels: Punctuated<ChannelDef, Comma> =
            content.parse_terminated(ChannelDef::parse, Token![,])?;

        Ok(ChannelSetInput {
            attrs,
            vis,
            name,
            channels: channels.into_iter().collect(),
        })
    }
}

/// Source spelling of a type without token spacing, e.g. `[f32; 6]`
fn type_name(ty: &Type) -> String {
    quote!(#ty)
        .to_string()
        .replace(" ;", ";")
        .replace("[ ", "[")
        .replace(" ]", "]")
        .replace(" ,", ",")
        .replace(" < ", "<")
        .replace(" >", ">")
}

fn validate(input: &ChannelSetInput) -> Result<()> {
    if input.channels.is_empty() {
        return Err(Error::new(
            input.name.span(),
            format!("channel set `{}` declares no channels", input.name),
        ));
    }

    let mut seen = HashSet::new();
    for channel in &input.channels {
        if !seen.insert(channel.name.to_string()) {
            return Err(Error::new(
                channel.name.span(),
                format!(
                    "duplicate channel `{}` in channel set `{}`",
                    channel.name, input.name
                ),
            ));
        }
    }
    Ok(())
}

/// Generate the set type, channel markers, storage and trait impls
pub fn generate_channel_set(input: ChannelSetInput) -> Result<TokenStream> {
    validate(&input)?;

    let ChannelSetInput {
        attrs,
        vis,
        name: set,
        channels,
    } = input;

    let set_name = set.to_string();
    let storage = format_ident!("{}Slots", set);

    let slot_fields: Vec<Ident> = (0..channels.len())
        .map(|i| format_ident!("slot_{}", i))
        .collect();
    let indices: Vec<usize> = (0..channels.len()).collect();
    let types: Vec<&Type> = channels.iter().map(|c| &c.ty).collect();

    let descriptors = channels.iter().enumerate().map(|(index, c)| {
        let name = c.name.to_string();
        let ty = &c.ty;
        let ty_name = type_name(ty);
        quote! {
            ::ctrlz_core::ChannelDescriptor::new(
                #name,
                #index,
                <#ty as ::ctrlz_core::ChannelValue>::DIM,
                <#ty as ::ctrlz_core::ChannelValue>::IS_ARRAY,
                #ty_name,
            )
        }
    });

    let markers = channels.iter().zip(slot_fields.iter()).enumerate().map(
        |(index, (c, field))| {
            let ChannelDef { attrs, name, ty } = c;
            let name_str = name.to_string();
            quote! {
                #(#attrs)*
                #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
                #vis struct #name;

                impl ::ctrlz_core::Channel for #name {
                    type Set = #set;
                    type Value = #ty;

                    const NAME: &'static str = #name_str;
                    const INDEX: usize = #index;

                    #[inline]
                    fn slot(storage: &#storage) -> &::ctrlz_core::Slot<#ty> {
                        &storage.#field
                    }
                }
            }
        },
    );

    Ok(quote! {
        #(#attrs)*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        #vis struct #set;

        #[doc(hidden)]
        #vis struct #storage {
            #( #slot_fields: ::ctrlz_core::Slot<#types>, )*
        }

        impl ::ctrlz_core::ChannelSet for #set {
            type Storage = #storage;

            const NAME: &'static str = #set_name;

            const DESCRIPTORS: &'static [::ctrlz_core::ChannelDescriptor] = &[
                #( #descriptors ),*
            ];

            fn new_storage() -> #storage {
                #storage {
                    #( #slot_fields: ::ctrlz_core::Slot::new(), )*
                }
            }

            fn export(
                storage: &#storage,
                index: usize,
                out: &mut ::std::vec::Vec<f64>,
            ) -> ::std::option::Option<u64> {
                match index {
                    #( #indices => ::std::option::Option::Some(storage.#slot_fields.export(out)), )*
                    _ => ::std::option::Option::None,
                }
            }
        }

        #(#markers)*
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(tokens: TokenStream) -> ChannelSetInput {
        syn::parse2(tokens).unwrap()
    }

    #[test]
    fn test_parse_with_visibility_and_docs() {
        let input = parse(quote! {
            /// Arm channels
            pub(crate) Arm {
                /// Joint angles
                Position: [f32; 6],
                Gain: f64,
            }
        });
        assert_eq!(input.name, "Arm");
        assert_eq!(input.attrs.len(), 1);
        assert_eq!(input.channels.len(), 2);
        assert_eq!(input.channels[0].attrs.len(), 1);
        assert!(matches!(input.vis, Visibility::Restricted(_)));
    }

    #[test]
    fn test_type_name_spelling() {
        let ty: Type = syn::parse_quote!([[f32; 3]; 3]);
        assert_eq!(type_name(&ty), "[[f32; 3]; 3]");
        let ty: Type = syn::parse_quote!(u64);
        assert_eq!(type_name(&ty), "u64");
    }

    #[test]
    fn test_duplicate_channel_rejected() {
        let input = parse(quote! { Bus { A: u8, B: u8, A: f32 } });
        let err = generate_channel_set(input).unwrap_err();
        assert!(err.to_string().contains("duplicate channel `A`"));
    }

    #[test]
    fn test_empty_set_rejected() {
        let input = parse(quote! { Bus {} });
        let err = generate_channel_set(input).unwrap_err();
        assert!(err.to_string().contains("declares no channels"));
    }

    #[test]
    fn test_generated_storage_has_one_slot_per_channel() {
        let input = parse(quote! { Bus { A: u8, B: [f32; 2], C: bool } });
        let out = generate_channel_set(input).unwrap().to_string();
        assert!(out.contains("struct BusSlots"));
        assert!(out.contains("slot_0"));
        assert!(out.contains("slot_2"));
        assert!(!out.contains("slot_3"));
    }
}
