//! Solution-set built-ins (spec.md §4.H): `findall/3`, `bagof/3`, `setof/3`.
//!
//! Grounded on the teacher's clause-iteration-plus-accumulator shape
//! (`machine/execution.rs`'s `execute_call` loop collecting into a `Vec`),
//! re-expressed over the engine's own `Solutions` pull loop instead of a
//! choice-point stack so the exact same backtracking semantics drive the
//! enumeration.

use std::collections::HashSet;
use std::rc::Rc;

use crate::database::Database;
use crate::engine::Engine;
use crate::env::fresh_var_id;
use crate::promise::{Cont, Outcome, Promise, Solutions};
use crate::term::{compare_standard_order, Term, VarId};
use crate::unify::unify;

pub fn install(db: &mut Database) {
    db.install_builtin("findall", 3, findall);
    db.install_builtin("bagof", 3, bagof);
    db.install_builtin("setof", 3, setof);
    db.install_builtin("forall", 2, forall);
    db.install_builtin("aggregate_all", 3, aggregate_all_count);
}

fn copy_term(engine: &Engine, term: &Term, map: &mut std::collections::HashMap<VarId, VarId>) -> Term {
    match engine.env.resolve(term) {
        Term::Var(v) => Term::Var(*map.entry(v).or_insert_with(fresh_var_id)),
        Term::Compound(f, a) => {
            Term::Compound(f, a.iter().map(|x| copy_term(engine, x, map)).collect())
        }
        other => other,
    }
}

/// Runs `goal` to exhaustion, invoking `collect` once per solution with the
/// environment in that solution's state; restores to the entry checkpoint
/// before returning. Shared by `findall`/`bagof`/`setof`/`forall`.
fn enumerate_solutions(
    engine: &mut Engine,
    goal: &Term,
    mut collect: impl FnMut(&mut Engine),
) -> Result<(), crate::error::PrologError> {
    let cp = engine.env.checkpoint();
    let local_barrier = engine.fresh_barrier();
    let probe = crate::resolver::call(engine, goal, Rc::new(|_: &mut Engine| Promise::success()), local_barrier);
    let mut sols = Solutions::new(probe);
    loop {
        match sols.next(engine) {
            Outcome::True => collect(engine),
            Outcome::False => break,
            Outcome::Error(e) => {
                engine.env.restore(cp);
                return Err(e);
            }
        }
    }
    engine.env.restore(cp);
    Ok(())
}

fn findall(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let template = args[0].clone();
    let goal = args[1].clone();
    let mut results = Vec::new();
    let res = enumerate_solutions(engine, &goal, |engine| {
        let mut map = std::collections::HashMap::new();
        results.push(copy_term(engine, &template, &mut map));
    });
    if let Err(e) = res {
        return Promise::error(e);
    }
    let list = Term::list(results);
    if unify(&mut engine.env, &args[2], &list, false) {
        k(engine)
    } else {
        Promise::failure()
    }
}

/// `forall(Cond, Action)`: succeeds iff every solution of `Cond` also
/// satisfies `Action` (spec.md's `\+ (Cond, \+ Action)` built as a real
/// enumeration rather than double negation, for a clearer failure path).
fn forall(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let cond = args[0].clone();
    let action = args[1].clone();
    let mut all_ok = true;
    let res = enumerate_solutions(engine, &cond, |engine| {
        if !all_ok {
            return;
        }
        let cp = engine.env.checkpoint();
        let barrier = engine.fresh_barrier();
        let probe = crate::resolver::call(engine, &action, Rc::new(|_: &mut Engine| Promise::success()), barrier);
        let ok = matches!(crate::promise::force_once(engine, probe), Outcome::True);
        engine.env.restore(cp);
        if !ok {
            all_ok = false;
        }
    });
    match res {
        Err(e) => Promise::error(e),
        Ok(()) if all_ok => k(engine),
        Ok(()) => Promise::failure(),
    }
}

/// `aggregate_all(count, Goal, Count)`: the one `aggregate_all/3` form in
/// scope -- counts `Goal`'s solutions. Other aggregate specs (`bag(_)`,
/// `set(_)`, `sum(_)`) are left to `findall`/`setof` directly.
fn aggregate_all_count(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let spec = engine.env.resolve(&args[0]);
    if !matches!(&spec, Term::Atom(a) if &**a == "count") {
        return Promise::error(crate::error::PrologError::domain_error(
            "aggregate_spec",
            spec,
        ));
    }
    let goal = args[1].clone();
    let mut count: i64 = 0;
    let res = enumerate_solutions(engine, &goal, |_engine| count += 1);
    if let Err(e) = res {
        return Promise::error(e);
    }
    if unify(&mut engine.env, &args[2], &Term::int(count), false) {
        k(engine)
    } else {
        Promise::failure()
    }
}

/// Strips `V1^V2^...^Goal0` existential quantifiers, returning the bound
/// variable ids and the unwrapped inner goal (spec.md's `bagof`/`setof`
/// free-variable rule).
fn strip_existentials(engine: &Engine, goal: &Term, bound: &mut HashSet<VarId>) -> Term {
    match engine.env.resolve(goal) {
        Term::Compound(f, args) if &*f == "^" && args.len() == 2 => {
            collect_vars(engine, &args[0], &mut HashSet::new(), bound);
            strip_existentials(engine, &args[1], bound)
        }
        other => other,
    }
}

fn collect_vars(engine: &Engine, term: &Term, seen: &mut HashSet<VarId>, out: &mut HashSet<VarId>) {
    match engine.env.resolve(term) {
        Term::Var(v) => {
            if seen.insert(v) {
                out.insert(v);
            }
        }
        Term::Compound(_, args) => {
            for a in &args {
                collect_vars(engine, a, seen, out);
            }
        }
        _ => {}
    }
}

fn free_variables_in_order(engine: &Engine, term: &Term, exclude: &HashSet<VarId>) -> Vec<VarId> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    fn walk(
        engine: &Engine,
        term: &Term,
        exclude: &HashSet<VarId>,
        seen: &mut HashSet<VarId>,
        ordered: &mut Vec<VarId>,
    ) {
        match engine.env.resolve(term) {
            Term::Var(v) => {
                if !exclude.contains(&v) && seen.insert(v) {
                    ordered.push(v);
                }
            }
            Term::Compound(_, args) => {
                for a in &args {
                    walk(engine, a, exclude, seen, ordered);
                }
            }
            _ => {}
        }
    }
    walk(engine, term, exclude, &mut seen, &mut ordered);
    ordered
}

/// Shared `bagof`/`setof` machinery: groups solutions by their free-variable
/// witness binding, returning each group as `(witness_term, items)` in
/// order of first appearance.
fn grouped_solutions(
    engine: &mut Engine,
    template: &Term,
    goal: &Term,
) -> Result<(Term, Vec<(Term, Vec<Term>)>), crate::error::PrologError> {
    let mut template_vars = HashSet::new();
    collect_vars(engine, template, &mut HashSet::new(), &mut template_vars);
    let mut existential = template_vars.clone();
    let inner_goal = strip_existentials(engine, goal, &mut existential);
    let free = free_variables_in_order(engine, &inner_goal, &existential);
    let witness_template = Term::list(free.iter().map(|v| Term::Var(*v)).collect());

    let mut groups: Vec<(Term, Vec<Term>)> = Vec::new();
    let res = enumerate_solutions(engine, &inner_goal, |engine| {
        let mut map = std::collections::HashMap::new();
        let witness = copy_term(engine, &witness_template, &mut map);
        let item = copy_term(engine, template, &mut map);
        match groups.iter_mut().find(|(w, _)| *w == witness) {
            Some((_, items)) => items.push(item),
            None => groups.push((witness, vec![item])),
        }
    });
    res?;
    Ok((witness_template, groups))
}

fn bagof(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let template = args[0].clone();
    let goal = args[1].clone();
    let (witness_template, groups) = match grouped_solutions(engine, &template, &goal) {
        Ok(g) => g,
        Err(e) => return Promise::error(e),
    };
    if groups.is_empty() {
        return Promise::failure();
    }
    let list_pat = args[2].clone();
    let alts: Vec<Promise> = groups
        .into_iter()
        .map(|(witness, items)| {
            let witness_template = witness_template.clone();
            let list_pat = list_pat.clone();
            let k = k.clone();
            Promise::delayed(move |engine: &mut Engine| {
                let cp = engine.env.checkpoint();
                let ok = unify(&mut engine.env, &witness_template, &witness, false)
                    && unify(&mut engine.env, &list_pat, &Term::list(items), false);
                if ok {
                    k(engine)
                } else {
                    engine.env.restore(cp);
                    Promise::failure()
                }
            })
        })
        .collect();
    Promise::Choice(alts, None)
}

fn setof(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let template = args[0].clone();
    let goal = args[1].clone();
    let (witness_template, groups) = match grouped_solutions(engine, &template, &goal) {
        Ok(g) => g,
        Err(e) => return Promise::error(e),
    };
    if groups.is_empty() {
        return Promise::failure();
    }
    let list_pat = args[2].clone();
    let alts: Vec<Promise> = groups
        .into_iter()
        .map(|(witness, mut items)| {
            items.sort_by(|a, b| compare_standard_order(&engine.env, a, b));
            items.dedup_by(|a, b| compare_standard_order(&engine.env, a, b) == std::cmp::Ordering::Equal);
            let witness_template = witness_template.clone();
            let list_pat = list_pat.clone();
            let k = k.clone();
            Promise::delayed(move |engine: &mut Engine| {
                let cp = engine.env.checkpoint();
                let ok = unify(&mut engine.env, &witness_template, &witness, false)
                    && unify(&mut engine.env, &list_pat, &Term::list(items), false);
                if ok {
                    k(engine)
                } else {
                    engine.env.restore(cp);
                    Promise::failure()
                }
            })
        })
        .collect();
    Promise::Choice(alts, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promise::Outcome;

    fn test_engine_with_p() -> Engine {
        let mut engine = Engine::with_builtins();
        for (a, b) in [(1, 1), (1, 2), (2, 3)] {
            crate::builtins::database_builtins::assert_clause(
                &mut engine,
                &Term::compound("p", vec![Term::int(a), Term::int(b)]),
                &Term::atom("true"),
                false,
            )
            .unwrap();
        }
        engine
    }

    #[test]
    fn findall_collects_every_solution_in_order() {
        let mut engine = test_engine_with_p();
        let x = fresh_var_id();
        let y = fresh_var_id();
        let l = fresh_var_id();
        let goal = Term::compound(
            "findall",
            vec![
                Term::var(y),
                Term::compound("p", vec![Term::var(x), Term::var(y)]),
                Term::var(l),
            ],
        );
        assert!(matches!(engine.solve_once(&goal), Outcome::True));
        assert_eq!(
            engine.env.resolve_deep(&Term::var(l)),
            Term::list(vec![Term::int(1), Term::int(2), Term::int(3)])
        );
    }

    #[test]
    fn findall_with_no_solutions_gives_empty_list() {
        let mut engine = test_engine_with_p();
        let l = fresh_var_id();
        let goal = Term::compound(
            "findall",
            vec![Term::int(1), Term::compound("p", vec![Term::int(99), Term::int(99)]), Term::var(l)],
        );
        assert!(matches!(engine.solve_once(&goal), Outcome::True));
        assert_eq!(engine.env.resolve_deep(&Term::var(l)), Term::nil());
    }

    #[test]
    fn bagof_groups_by_free_variable() {
        let mut engine = test_engine_with_p();
        let x = fresh_var_id();
        let y = fresh_var_id();
        let l = fresh_var_id();
        let goal = Term::compound(
            "bagof",
            vec![
                Term::var(y),
                Term::compound("p", vec![Term::var(x), Term::var(y)]),
                Term::var(l),
            ],
        );
        let mut sols = engine.solve(&goal);
        let mut groups = Vec::new();
        loop {
            match sols.next(&mut engine) {
                Outcome::True => groups.push((
                    engine.env.resolve(&Term::var(x)),
                    engine.env.resolve_deep(&Term::var(l)),
                )),
                _ => break,
            }
        }
        assert_eq!(
            groups,
            vec![
                (Term::int(1), Term::list(vec![Term::int(1), Term::int(2)])),
                (Term::int(2), Term::list(vec![Term::int(3)])),
            ]
        );
    }

    #[test]
    fn setof_sorts_and_dedups_each_group() {
        let mut engine = Engine::with_builtins();
        for v in [3, 1, 2, 1] {
            crate::builtins::database_builtins::assert_clause(
                &mut engine,
                &Term::compound("q", vec![Term::int(v)]),
                &Term::atom("true"),
                false,
            )
            .unwrap();
        }
        let x = fresh_var_id();
        let l = fresh_var_id();
        let goal = Term::compound(
            "setof",
            vec![Term::var(x), Term::compound("q", vec![Term::var(x)]), Term::var(l)],
        );
        assert!(matches!(engine.solve_once(&goal), Outcome::True));
        assert_eq!(
            engine.env.resolve_deep(&Term::var(l)),
            Term::list(vec![Term::int(1), Term::int(2), Term::int(3)])
        );
    }

    #[test]
    fn bagof_fails_when_goal_has_no_solutions() {
        let mut engine = test_engine_with_p();
        let l = fresh_var_id();
        let goal = Term::compound(
            "bagof",
            vec![Term::int(1), Term::compound("p", vec![Term::int(9), Term::int(9)]), Term::var(l)],
        );
        assert!(matches!(engine.solve_once(&goal), Outcome::False));
    }
}
