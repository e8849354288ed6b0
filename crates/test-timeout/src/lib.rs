//! `#[timeout]` / `#[timeout(secs)]`: runs a synchronous test body on its own
//! thread and fails the test if it does not finish in time.
//!
//! Codec bugs tend to show up as a decoder spinning on a corrupt length, so
//! every wire test carries a deadline instead of hanging the whole run.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, ItemFn, LitInt};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[proc_macro_attribute]
pub fn timeout(attr: TokenStream, item: TokenStream) -> TokenStream {
    let timeout_secs = match parse_timeout(attr) {
        Ok(secs) => secs,
        Err(err) => return err.to_compile_error().into(),
    };

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = parse_macro_input!(item as ItemFn);

    if sig.asyncness.is_some() {
        return syn::Error::new_spanned(&sig.ident, "#[timeout] expects a synchronous test")
            .to_compile_error()
            .into();
    }
    if !sig.inputs.is_empty() {
        return syn::Error::new_spanned(&sig.inputs, "#[timeout] tests take no arguments")
            .to_compile_error()
            .into();
    }

    let attrs: Vec<Attribute> = attrs.into_iter().filter(|a| !is_test_attribute(a)).collect();
    let thread_name = sig.ident.to_string();

    TokenStream::from(quote! {
        #[test]
        #(#attrs)*
        #vis #sig {
            let deadline = ::std::time::Duration::from_secs(#timeout_secs);
            let (sender, receiver) = ::std::sync::mpsc::channel();
            ::std::thread::Builder::new()
                .name(#thread_name.to_string())
                .spawn(move || {
                    let outcome = ::std::panic::catch_unwind(
                        ::std::panic::AssertUnwindSafe(move || #block),
                    );
                    let _ = sender.send(outcome);
                })
                .expect("spawn test thread");
            match receiver.recv_timeout(deadline) {
                Ok(Ok(value)) => value,
                Ok(Err(payload)) => ::std::panic::resume_unwind(payload),
                Err(::std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    panic!("{} timed out after {:?}", #thread_name, deadline)
                }
                Err(::std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    panic!("{} exited without reporting", #thread_name)
                }
            }
        }
    })
}

fn parse_timeout(attr: TokenStream) -> syn::Result<u64> {
    if attr.is_empty() {
        return Ok(DEFAULT_TIMEOUT_SECS);
    }
    let lit: LitInt = syn::parse(attr)?;
    let secs: u64 = lit.base10_parse()?;
    if secs == 0 {
        return Err(syn::Error::new_spanned(lit, "timeout must be greater than zero"));
    }
    Ok(secs)
}

fn is_test_attribute(attr: &Attribute) -> bool {
    attr.path().is_ident("test")
}
