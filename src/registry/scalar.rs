use super::compare::*;
use super::{BuiltinRegistry, Shape};
use crate::types::{Type, Underlying};

pub(super) fn register(r: &mut BuiltinRegistry) {
    use Shape::{ContainedIn, Scalar};

    // bool
    r.equality(Underlying::Bool, None, Type::Bool, Scalar, bool_eq_bool);
    r.equality(Underlying::Bool, None, Type::String, Scalar, bool_eq_string);
    r.matching(Underlying::Bool, None, Type::Regex, Scalar, bool_matches);
    r.equality(Underlying::Bool, None, Type::array(Type::Bool), ContainedIn, bool_eq_bool);
    r.equality(Underlying::Bool, None, Type::array(Type::String), ContainedIn, bool_eq_string);

    // int
    r.equality(Underlying::Int, None, Type::Int, Scalar, int_eq_int);
    r.equality(Underlying::Int, None, Type::Float, Scalar, int_eq_float);
    r.equality(Underlying::Int, None, Type::String, Scalar, int_eq_string);
    r.matching(Underlying::Int, None, Type::Regex, Scalar, int_matches);
    r.equality(Underlying::Int, None, Type::array(Type::Int), ContainedIn, int_eq_int);
    r.equality(Underlying::Int, None, Type::array(Type::Float), ContainedIn, int_eq_float);
    r.equality(Underlying::Int, None, Type::array(Type::String), ContainedIn, int_eq_string);
    r.ordering(Underlying::Int, Type::Int, int_cmp_int);
    r.ordering(Underlying::Int, Type::Float, int_cmp_float);
    r.ordering(Underlying::Int, Type::String, int_cmp_string);

    // float
    r.equality(Underlying::Float, None, Type::Float, Scalar, float_eq_float);
    r.equality(Underlying::Float, None, Type::Int, Scalar, float_eq_int);
    r.equality(Underlying::Float, None, Type::String, Scalar, float_eq_string);
    r.matching(Underlying::Float, None, Type::Regex, Scalar, float_matches);
    r.equality(Underlying::Float, None, Type::array(Type::Float), ContainedIn, float_eq_float);
    r.equality(Underlying::Float, None, Type::array(Type::Int), ContainedIn, float_eq_int);
    r.equality(Underlying::Float, None, Type::array(Type::String), ContainedIn, float_eq_string);
    r.ordering(Underlying::Float, Type::Float, float_cmp_float);
    r.ordering(Underlying::Float, Type::Int, float_cmp_int);
    r.ordering(Underlying::Float, Type::String, float_cmp_string);

    // string
    r.equality(Underlying::String, None, Type::String, Scalar, string_eq_string);
    r.matching(Underlying::String, None, Type::Regex, Scalar, string_matches);
    r.equality(Underlying::String, None, Type::Bool, Scalar, string_eq_bool);
    r.equality(Underlying::String, None, Type::Int, Scalar, string_eq_int);
    r.equality(Underlying::String, None, Type::Float, Scalar, string_eq_float);
    r.equality(Underlying::String, None, Type::array(Type::String), ContainedIn, string_eq_string);
    r.equality(Underlying::String, None, Type::array(Type::Bool), ContainedIn, string_eq_bool);
    r.equality(Underlying::String, None, Type::array(Type::Int), ContainedIn, string_eq_int);
    r.equality(Underlying::String, None, Type::array(Type::Float), ContainedIn, string_eq_float);
    r.ordering(Underlying::String, Type::String, string_cmp_string);
    r.ordering(Underlying::String, Type::Int, string_cmp_int);
    r.ordering(Underlying::String, Type::Float, string_cmp_float);

    // regex: equality against a regex is a pattern match, except regex to
    // regex which compares the patterns themselves
    r.equality(Underlying::Regex, None, Type::Regex, Scalar, string_eq_string);
    r.matching(Underlying::Regex, None, Type::Bool, Scalar, bool_matches);
    r.matching(Underlying::Regex, None, Type::Int, Scalar, int_matches);
    r.matching(Underlying::Regex, None, Type::Float, Scalar, float_matches);
    r.matching(Underlying::Regex, None, Type::String, Scalar, string_matches);
    r.equality(Underlying::Regex, None, Type::array(Type::Regex), ContainedIn, string_eq_string);
    r.matching(Underlying::Regex, None, Type::array(Type::Bool), ContainedIn, bool_matches);
    r.matching(Underlying::Regex, None, Type::array(Type::Int), ContainedIn, int_matches);
    r.matching(Underlying::Regex, None, Type::array(Type::Float), ContainedIn, float_matches);
    r.matching(Underlying::Regex, None, Type::array(Type::String), ContainedIn, string_matches);
}
