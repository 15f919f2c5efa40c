pub(crate) use proc_macro::TokenStream;
pub(crate) use proc_macro2::{Ident, TokenStream as TokenStream2};
pub(crate) use quote::{quote, ToTokens, TokenStreamExt};
