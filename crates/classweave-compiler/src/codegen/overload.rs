//! Overload resolution.
//!
//! A candidate is viable when every argument type is compatible with the
//! parameter at its position. Each argument costs 0 when its type is the
//! parameter type and 1 when it only converts. The viable candidate with the
//! lowest total wins; on a tie the earlier candidate wins, which for
//! [`TypeUniverse::methods_named`](classweave_core::TypeUniverse::methods_named)
//! results means the nearest declaring class.

use classweave_core::{TypeEnv, TypeRef};

const EXACT: u32 = 0;
const CONVERSION: u32 = 1;

fn cost(param: &TypeRef, arg: &TypeRef, env: &TypeEnv<'_>) -> Option<u32> {
    let same = match (param.bind(env.this_class), arg.bind(env.this_class)) {
        (Ok(param), Ok(arg)) => param == arg,
        _ => false,
    };
    if same {
        Some(EXACT)
    } else if arg.is_compatible_with(param, env) {
        Some(CONVERSION)
    } else {
        None
    }
}

/// Total conversion cost of calling with `args`, `None` if not viable.
fn total_cost(params: &[TypeRef], args: &[TypeRef], env: &TypeEnv<'_>) -> Option<u32> {
    if params.len() != args.len() {
        return None;
    }
    params
        .iter()
        .zip(args)
        .map(|(param, arg)| cost(param, arg, env))
        .sum()
}

/// Pick the best candidate for `args`.
///
/// `params` extracts a candidate's parameter types.
pub fn select_overload<'c, T>(
    candidates: &'c [T],
    params: impl Fn(&T) -> &[TypeRef],
    args: &[TypeRef],
    env: &TypeEnv<'_>,
) -> Option<&'c T> {
    let mut best: Option<(u32, &'c T)> = None;
    for candidate in candidates {
        let Some(cost) = total_cost(params(candidate), args, env) else {
            continue;
        };
        if best.is_none_or(|(best_cost, _)| cost < best_cost) {
            best = Some((cost, candidate));
        }
    }
    best.map(|(_, candidate)| candidate)
}

/// Argument types as shown in error messages.
pub(crate) fn render_args(args: &[TypeRef]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
