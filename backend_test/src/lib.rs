use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, GenericArgument, Ident, ItemFn, Pat, PathArguments,
    Signature, Type,
};

/// Transform an asynchronous test into a synchronous one, inject dependencies,
/// and ensure that the database is dropped regardless of how the test terminates.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// [`mongodb::Database`], [`crate::model::mongodb::Coll<T>`], and
/// [`crate::test_util::TestUser`]. A `TestUser` is only available with
/// `#[backend_test(admin)]` or `#[backend_test(voter)]`, which sign up the
/// example admin or voter before the test starts.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let signature = match check_sig(item_fn.sig.clone()) {
        Ok(signature) => signature,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };
    let TestSignature {
        args: test_args,
        collection_idents,
        collection_types,
        user_span,
    } = signature;

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Sign up as admin/voter if needed.
    let sign_up_as = match parse_macro_input!(args as Option<Ident>) {
        Some(arg) if arg == "admin" => Some(quote! { example_admin }),
        Some(arg) if arg == "voter" => Some(quote! { example }),
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected `admin` or `voter`")
                .into_compile_error()
                .into();
        }
        None => None,
    };
    let maybe_sign_up = match (sign_up_as, user_span) {
        (Some(example), _) => quote! {
            Some(
                crate::test_util::TestUser::sign_up(
                    &rocket_client,
                    crate::model::api::user::SignupRequest::#example(),
                )
                .await,
            )
        },
        (None, Some(span)) => {
            return syn::Error::new(
                span,
                "A `TestUser` needs `#[backend_test(admin)]` or `#[backend_test(voter)]`",
            )
            .into_compile_error()
            .into();
        }
        (None, None) => quote! { None },
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup() -> (
                rocket::local::asynchronous::Client,
                mongodb::Database,
                Option<crate::test_util::TestUser>,
            ) {
                let rocket_client = rocket::local::asynchronous::Client::tracked(crate::build())
                    .await
                    .unwrap();
                let db = rocket_client
                    .rocket()
                    .state::<mongodb::Database>()
                    .unwrap()
                    .clone();

                let user: Option<crate::test_util::TestUser> = #maybe_sign_up;

                (rocket_client, db, user)
            }

            /// The test itself.
            #item_fn

            /// Test cleanup.
            async fn cleanup(db: mongodb::Database) {
                db.drop(None).await.unwrap();
            }

            // Create an async runtime. We need a separate one for inside and
            // outside the `catch_unwind`.
            let outer_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("test-setup-cleanup")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();
            let inner_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            // Run the setup.
            let (rocket_client, db, user) = outer_runtime.block_on(setup());

            // Run the test, catching any panics.
            // Use mutexes to safely transfer `!UnwindSafe` data.
            let client_mutex = std::sync::Mutex::new(rocket_client);
            let db_mutex = std::sync::Mutex::new(db.clone());
            let user_mutex = std::sync::Mutex::new(user);
            let runtime_mutex = std::sync::Mutex::new(inner_runtime);
            let result = std::panic::catch_unwind(|| {
                let rocket_client = client_mutex.into_inner().unwrap();
                let db = db_mutex.into_inner().unwrap();
                #[allow(unused_variables)]
                let user = user_mutex.into_inner().unwrap();
                let runtime = runtime_mutex.into_inner().unwrap();

                #(
                    let #collection_idents = crate::model::mongodb::Coll::<#collection_types>::from_db(&db);
                )*

                runtime.block_on(#new_name(#(#test_args),*));
            });

            // Run the cleanup.
            outer_runtime.block_on(cleanup(db));

            // If the test panicked, re-raise the panic.
            if let Err(cause) = result {
                std::panic::panic_any(cause);
            }
        }
    }
    .into()
}

/// What the wrapped test asks to have injected.
struct TestSignature {
    /// Expressions for every parameter, in order.
    args: Vec<TokenStream2>,
    collection_idents: Vec<Ident>,
    collection_types: Vec<Ident>,
    /// Where a `TestUser` was requested, if at all.
    user_span: Option<proc_macro2::Span>,
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<TestSignature, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_db = false;
    let mut signature = TestSignature {
        args: vec![],
        collection_idents: vec![],
        collection_types: vec![],
        user_span: None,
    };

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(pat_ident) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    if let Some(type_ident) = type_path.path.get_ident() {
                        let injected = if type_ident == "Client" {
                            if has_client {
                                return Err(syn::Error::new(input.span(), "Test cannot accept more than one `rocket::local::asynchronous::Client`"));
                            }
                            has_client = true;
                            Some(quote! { rocket_client })
                        } else if type_ident == "Database" {
                            if has_db {
                                return Err(syn::Error::new(
                                    input.span(),
                                    "Test cannot accept more than one `mongodb::Database`",
                                ));
                            }
                            has_db = true;
                            Some(quote! { db })
                        } else if type_ident == "TestUser" {
                            if signature.user_span.is_some() {
                                return Err(syn::Error::new(
                                    input.span(),
                                    "Test cannot accept more than one `TestUser`",
                                ));
                            }
                            signature.user_span = Some(input.span());
                            Some(quote! { user.clone().unwrap() })
                        } else {
                            None
                        };
                        if let Some(injected) = injected {
                            signature.args.push(injected);
                            continue;
                        }
                    } else {
                        // Valid as the last path segment for any type is itself
                        let possible_collection = type_path.path.segments.last().unwrap();
                        if possible_collection.ident == "Coll" {
                            if let PathArguments::AngleBracketed(generics) =
                                &possible_collection.arguments
                            {
                                if let Some(GenericArgument::Type(Type::Path(type_path))) =
                                    generics.args.first()
                                {
                                    if let Some(type_ident) = type_path.path.get_ident() {
                                        let ident = &pat_ident.ident;
                                        signature.args.push(quote! { #ident });
                                        signature.collection_idents.push(ident.clone());
                                        signature.collection_types.push(type_ident.clone());
                                        continue;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client`, `db_ident: Database`, `user_ident: TestUser` or `collection_ident: Coll<T>`",
        ));
    }

    Ok(signature)
}
