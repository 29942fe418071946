use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, FnArg, GenericArgument, ItemFn, PatType, PathArguments, Type, TypePath,
};

fn unsupported_type_msg(arg_name: &str, arg_pos: usize, fn_name: &str) -> String {
    format!(
        "Unsupported type for argument {} ('{}') of {}: expected f64, bool, String, Value, Option<f64> or Option<String>",
        arg_pos, arg_name, fn_name
    )
}

/// Last path segment of a type, e.g. `Option` for `std::option::Option<f64>`.
fn last_segment(ty: &TypePath) -> Option<&syn::PathSegment> {
    ty.path.segments.last()
}

/// Inner type name of `Option<T>`, if `ty` is one.
fn option_inner(ty: &TypePath) -> Option<String> {
    let segment = last_segment(ty)?;
    if segment.ident != "Option" {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(generics) => match generics.args.first()? {
            GenericArgument::Type(Type::Path(inner)) => {
                last_segment(inner).map(|s| s.ident.to_string())
            }
            _ => None,
        },
        _ => None,
    }
}

/// Turns a typed function into a formula builtin with the registry signature
/// `fn(&[Value], &Context) -> Result<Value, EvalError>`.
///
/// Positional arguments are extracted leniently: a missing argument becomes the
/// type's neutral value (`0.0`, `false`, `""`, `Value::Null` or `None`) instead
/// of an arity error.
#[proc_macro_attribute]
pub fn formula_fn(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let fn_vis = &input.vis;
    let fn_name = &input.sig.ident;
    let fn_args = &input.sig.inputs;
    let fn_body = &input.block;
    let fn_output = &input.sig.output;

    let mut arg_extractions = Vec::new();

    for (i, arg) in fn_args.iter().enumerate() {
        let FnArg::Typed(PatType { pat, ty, .. }) = arg else {
            return syn::Error::new_spanned(arg, "formula functions cannot take `self`")
                .to_compile_error()
                .into();
        };
        let arg_name = match **pat {
            syn::Pat::Ident(ref ident) => &ident.ident,
            _ => {
                return syn::Error::new_spanned(pat, "Unsupported argument pattern")
                    .to_compile_error()
                    .into()
            }
        };

        let err_msg = unsupported_type_msg(&arg_name.to_string(), i, &fn_name.to_string());

        let type_path = match **ty {
            Type::Path(ref type_path) => type_path,
            _ => {
                return syn::Error::new_spanned(ty, err_msg)
                    .to_compile_error()
                    .into()
            }
        };

        let extract_code = if let Some(inner) = option_inner(type_path) {
            match inner.as_str() {
                "f64" => quote! {
                    let #arg_name: Option<f64> = args
                        .get(#i)
                        .filter(|v| !v.is_null())
                        .map(crate::ast::Value::to_number);
                },
                "String" => quote! {
                    let #arg_name: Option<String> = args
                        .get(#i)
                        .filter(|v| !v.is_null())
                        .map(crate::ast::Value::to_text);
                },
                _ => {
                    return syn::Error::new_spanned(ty, err_msg)
                        .to_compile_error()
                        .into()
                }
            }
        } else {
            let type_ident = match last_segment(type_path) {
                Some(segment) => segment.ident.to_string(),
                None => {
                    return syn::Error::new_spanned(ty, err_msg)
                        .to_compile_error()
                        .into()
                }
            };
            match type_ident.as_str() {
                "f64" => quote! {
                    let #arg_name: f64 = args
                        .get(#i)
                        .map(crate::ast::Value::to_number)
                        .unwrap_or(0.0);
                },
                "bool" => quote! {
                    let #arg_name: bool = args
                        .get(#i)
                        .map(crate::ast::Value::is_truthy)
                        .unwrap_or(false);
                },
                "String" => quote! {
                    let #arg_name: String = args
                        .get(#i)
                        .map(crate::ast::Value::to_text)
                        .unwrap_or_default();
                },
                "Value" => quote! {
                    let #arg_name: crate::ast::Value = args
                        .get(#i)
                        .cloned()
                        .unwrap_or(crate::ast::Value::Null);
                },
                _ => {
                    return syn::Error::new_spanned(ty, err_msg)
                        .to_compile_error()
                        .into()
                }
            }
        };

        arg_extractions.push(extract_code);
    }

    let expanded = quote! {
        #[allow(unused_variables)]
        #fn_vis fn #fn_name(
            args: &[crate::ast::Value],
            _context: &crate::ast::Context,
        ) #fn_output {
            #(#arg_extractions)*

            #fn_body
        }
    };

    TokenStream::from(expanded)
}
