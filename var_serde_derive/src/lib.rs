//! Derive macros for the consensus-critical `VarSerialize` and
//! `VarDeserialize` traits.
//!
//! The generated impls serialize struct fields in declaration order, which
//! is exactly the on-wire field order for every consensus structure.
extern crate proc_macro;
use proc_macro::TokenStream;

mod deserialize;
mod serialize;

#[proc_macro_derive(VarDeserialize)]
pub fn deserializable(input: TokenStream) -> TokenStream {
    let ast = syn::parse(input).unwrap();
    deserialize::impl_deser_macro(&ast)
}

#[proc_macro_derive(VarSerialize)]
pub fn serializable(input: TokenStream) -> TokenStream {
    let ast = syn::parse(input).unwrap();
    serialize::impl_ser_macro(&ast)
}
