//! Procedural macros used in the definition of the set and add operations exposed by
//! NamePolicyEngineBuilder

use proc_macro_error::{abort_call_site, proc_macro_error};
use quote::quote;
use syn::parse::ParseStream;
use syn::parse::{Parse, Result};
use syn::{Ident, Token};

type ListName = Ident;
type FieldName = Ident;
type SingularName = Ident;
type NormalizerName = Ident;

/// Signature contains the results of parsing an npe_sets_and_adds definition, i.e., the list that
/// is targeted (permitted or excluded), the field within that list, the singular noun used to name
/// the generated operations and the normalizer applied to each raw value.
struct Signature {
    list_name: ListName,
    field_name: FieldName,
    singular_name: SingularName,
    normalizer_name: NormalizerName,
}

/// Syntax contains the components of an npe_sets_and_adds, i.e., four identifiers separated by
/// commas. For example:
///     ```text
///     npe_sets_and_adds!(permitted, dns_domains, dns_domain, normalize_dns_domain);
///     ```
struct Syntax {
    list_name: ListName,
    _comma_token1: Token!(,),
    field_name: FieldName,
    _comma_token2: Token!(,),
    singular_name: SingularName,
    _comma_token3: Token!(,),
    normalizer_name: NormalizerName,
}

/// pluralize appends "es" to nouns ending in s (i.e., address) and "s" to everything else.
fn pluralize(singular: &str) -> String {
    if singular.ends_with('s') {
        format!("{}es", singular)
    } else {
        format!("{}s", singular)
    }
}

impl Parse for Signature {
    fn parse(stream: ParseStream<'_>) -> Result<Self> {
        if stream.is_empty() {
            abort_call_site!("Write full operation signature.");
        }

        let syntax = Syntax {
            list_name: stream.parse()?,
            _comma_token1: stream.parse()?,
            field_name: stream.parse()?,
            _comma_token2: stream.parse()?,
            singular_name: stream.parse()?,
            _comma_token3: stream.parse()?,
            normalizer_name: stream.parse()?,
        };

        Ok(Signature {
            list_name: syntax.list_name,
            field_name: syntax.field_name,
            singular_name: syntax.singular_name,
            normalizer_name: syntax.normalizer_name,
        })
    }
}

/// `npe_sets_and_adds` generates four methods for use within an `impl NamePolicyEngineBuilder`
/// block: `set_<list>_<plural>`, `add_<list>_<plural>`, `set_<list>_<singular>` and
/// `add_<list>_<singular>`. The plural forms normalize every value before touching the builder so
/// a failure leaves the targeted list unchanged.
#[proc_macro_error]
#[proc_macro]
pub fn npe_sets_and_adds(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let signature = syn::parse_macro_input!(input as Signature);
    let list = signature.list_name;
    let field = signature.field_name;
    let normalizer = signature.normalizer_name;

    let list_str = format!("{}", list);
    if list_str != "permitted" && list_str != "excluded" {
        abort_call_site!("List name must be either permitted or excluded.");
    }
    let singular_str = format!("{}", signature.singular_name);
    let plural_str = pluralize(&singular_str);

    let set_many_str = format!("set_{}_{}", list_str, plural_str);
    let add_many_str = format!("add_{}_{}", list_str, plural_str);
    let set_one_str = format!("set_{}_{}", list_str, singular_str);
    let add_one_str = format!("add_{}_{}", list_str, singular_str);

    let set_many = syn::Ident::new(&set_many_str, list.span());
    let add_many = syn::Ident::new(&add_many_str, list.span());
    let set_one = syn::Ident::new(&set_one_str, list.span());
    let add_one = syn::Ident::new(&add_one_str, list.span());

    let set_many_comment = format!(
        "`{}` replaces the {} `{}` list with the normalized form of each value, failing without change if any value is invalid",
        set_many_str, list_str, field
    );
    let add_many_comment = format!(
        "`{}` appends the normalized form of each value to the {} `{}` list, failing without change if any value is invalid",
        add_many_str, list_str, field
    );
    let set_one_comment = format!(
        "`{}` replaces the {} `{}` list with the normalized form of a single value",
        set_one_str, list_str, field
    );
    let add_one_comment = format!(
        "`{}` appends the normalized form of a single value to the {} `{}` list",
        add_one_str, list_str, field
    );

    let tokens = quote! {
            #[doc = #set_many_comment]
            pub fn #set_many<S: AsRef<str>>(&mut self, values: &[S]) -> Result<()> {
                let normalized = normalize_all(values, #normalizer)?;
                self.#list.#field = normalized;
                Ok(())
            }
            #[doc = #add_many_comment]
            pub fn #add_many<S: AsRef<str>>(&mut self, values: &[S]) -> Result<()> {
                let mut normalized = normalize_all(values, #normalizer)?;
                self.#list.#field.append(&mut normalized);
                Ok(())
            }
            #[doc = #set_one_comment]
            pub fn #set_one(&mut self, value: &str) -> Result<()> {
                let normalized = logged(#normalizer(value))?;
                self.#list.#field = vec![normalized];
                Ok(())
            }
            #[doc = #add_one_comment]
            pub fn #add_one(&mut self, value: &str) -> Result<()> {
                let normalized = logged(#normalizer(value))?;
                self.#list.#field.push(normalized);
                Ok(())
            }
    };
    tokens.into()
}
