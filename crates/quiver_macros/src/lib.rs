use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, FnArg, ItemFn, LitInt, Pat};

/// Budget used when `#[profile]` is given no argument. A 60 Hz frame has
/// about 16ms in total, so a single system over 2ms is worth a line.
const DEFAULT_BUDGET_MS: u64 = 2;

/// Frames between unconditional reports, about ten seconds at 60 Hz.
/// `profile_log!` in the main crate uses the same interval.
const REPORT_INTERVAL: u32 = 600;

/// Frame-time guard for render systems, active only with `perf_stats`.
///
/// `#[profile]` or `#[profile(ms)]`. A run slower than the budget is logged
/// with its duration. When the system takes `frame: Res<FrameCount>`, the
/// frame number is included and one report is also written every
/// 600 frames regardless of timing.
///
/// ```ignore
/// #[profile(4)]
/// fn composite_frame(field: ResMut<FieldSurface>, frame: Res<FrameCount>) { ... }
/// ```
#[proc_macro_attribute]
pub fn profile(attr: TokenStream, item: TokenStream) -> TokenStream {
    let budget_ms = if attr.is_empty() {
        DEFAULT_BUDGET_MS
    } else {
        match syn::parse::<LitInt>(attr).and_then(|lit| lit.base10_parse::<u64>()) {
            Ok(ms) => ms,
            Err(e) => return e.to_compile_error().into(),
        }
    };

    let ItemFn { attrs, vis, sig, block } = parse_macro_input!(item as ItemFn);
    let system_name = sig.ident.to_string();

    let takes_frame = sig.inputs.iter().any(|arg| match arg {
        FnArg::Typed(typed) => {
            let named_frame = matches!(&*typed.pat, Pat::Ident(p) if p.ident == "frame");
            let ty = &typed.ty;
            named_frame && quote!(#ty).to_string().contains("FrameCount")
        }
        FnArg::Receiver(_) => false,
    });
    let frame_number = if takes_frame {
        quote!(::core::option::Option::Some(frame.0))
    } else {
        quote!(::core::option::Option::None)
    };

    let output = quote! {
        #(#attrs)*
        #vis #sig {
            #[cfg(feature = "perf_stats")]
            let _frame_timer = {
                struct FrameTimer {
                    system: &'static str,
                    started: std::time::Instant,
                    frame: ::core::option::Option<u32>,
                }
                impl Drop for FrameTimer {
                    fn drop(&mut self) {
                        let elapsed = self.started.elapsed();
                        let over_budget = elapsed > std::time::Duration::from_millis(#budget_ms);
                        let scheduled = self.frame.is_some_and(|f| f % #REPORT_INTERVAL == 0);
                        if !(over_budget || scheduled) {
                            return;
                        }
                        match self.frame {
                            Some(f) => bevy::prelude::info!("[PERF] {} @ frame {}: {:?}", self.system, f, elapsed),
                            None => bevy::prelude::info!("[PERF] {}: {:?}", self.system, elapsed),
                        }
                    }
                }
                FrameTimer {
                    system: #system_name,
                    started: std::time::Instant::now(),
                    frame: #frame_number,
                }
            };

            #block
        }
    };

    output.into()
}
