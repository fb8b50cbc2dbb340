//! Stock recognizers.
//!
//! Each one is a plain function matching the [`Recognizer`] shape: it inspects
//! a single `RawType` variant, declines everything else, and recurses through
//! the pipeline for nested arguments. Order below is priority order.
pub mod class;
pub mod function;
pub mod generic;
pub mod scalar;
pub mod union;

use crate::pipeline::Recognizer;

pub fn standard() -> Vec<Box<dyn Recognizer>> {
    vec![
        Box::new(scalar::enum_found),
        Box::new(generic::list_found),
        Box::new(union::union_found),
        Box::new(class::typed_dict_found),
        Box::new(scalar::literal_found),
        Box::new(generic::dict_found),
        Box::new(generic::tuple_found),
        Box::new(generic::mapping_found),
        Box::new(scalar::type_var_found),
        Box::new(class::fixed_generic_found),
        Box::new(class::reference_found),
        Box::new(class::class_found),
        Box::new(class::new_type_found),
        Box::new(function::function_found),
        Box::new(scalar::none_found),
        Box::new(scalar::builtin_found),
    ]
}
