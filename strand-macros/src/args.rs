use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{Error, Expr, ExprLit, Lit, LitInt, LitStr, MetaNameValue, Token};

/// Arguments accepted by `#[strand::main]` and `#[strand::test]`.
///
/// ```text
/// #[strand::main(worker_threads = 4, thread_name = "app")]
/// ```
#[derive(Default)]
pub(crate) struct RuntimeArgs {
    pub(crate) worker_threads: Option<LitInt>,
    pub(crate) thread_name: Option<LitStr>,
}

impl Parse for RuntimeArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = RuntimeArgs::default();

        let pairs = Punctuated::<MetaNameValue, Token![,]>::parse_terminated(input)?;
        for pair in pairs {
            let Expr::Lit(ExprLit { lit, .. }) = &pair.value else {
                return Err(Error::new_spanned(&pair.value, "expected a literal"));
            };

            if pair.path.is_ident("worker_threads") {
                let Lit::Int(n) = lit else {
                    return Err(Error::new_spanned(lit, "worker_threads expects an integer"));
                };
                if n.base10_parse::<usize>()? == 0 {
                    return Err(Error::new_spanned(n, "worker_threads must be > 0"));
                }
                args.worker_threads = Some(n.clone());
            } else if pair.path.is_ident("thread_name") {
                let Lit::Str(name) = lit else {
                    return Err(Error::new_spanned(lit, "thread_name expects a string"));
                };
                args.thread_name = Some(name.clone());
            } else {
                return Err(Error::new_spanned(
                    &pair.path,
                    "unknown argument, expected `worker_threads` or `thread_name`",
                ));
            }
        }

        Ok(args)
    }
}
