//! Attribute macros running an async function on a `strand` runtime.

mod args;

use args::RuntimeArgs;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Error, ItemFn, parse_macro_input};

/// Runs `async fn main` on a freshly built runtime.
///
/// Accepts `worker_threads = N` and `thread_name = "..."`.
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as RuntimeArgs);
    let input = parse_macro_input!(item as ItemFn);

    if input.sig.ident != "main" {
        return Error::new_spanned(&input.sig.ident, "#[strand::main] must be used on fn main")
            .to_compile_error()
            .into();
    }

    expand(args, input, "#[strand::main]", quote! {}).into()
}

/// Runs an `async fn` test on a freshly built runtime.
///
/// Accepts the same arguments as [`macro@main`].
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as RuntimeArgs);
    let input = parse_macro_input!(item as ItemFn);

    expand(args, input, "#[strand::test]", quote! { #[::core::prelude::v1::test] }).into()
}

fn expand(args: RuntimeArgs, mut input: ItemFn, name: &str, prefix: TokenStream2) -> TokenStream2 {
    if input.sig.asyncness.take().is_none() {
        return Error::new_spanned(
            input.sig.fn_token,
            format!("{name} must be used on an async function"),
        )
        .to_compile_error();
    }

    let worker_threads = args
        .worker_threads
        .map(|n| quote! { .worker_threads(#n) });
    let thread_name = args.thread_name.map(|name| quote! { .thread_name(#name) });

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;

    quote! {
        #prefix
        #(#attrs)*
        #vis #sig {
            let runtime = ::strand::RuntimeBuilder::new()
                #worker_threads
                #thread_name
                .build();

            runtime.block_on(async move #block)
        }
    }
}
