//! Property tests for registry invariants
//!
//! Random acyclic graphs registered in random order must load completely,
//! in a topological order, with every factory invoked at most once.

use proptest::prelude::*;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use deferred_loader::Loader;

/// Edges only point from higher to lower indices, so the graph is acyclic
fn dag_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..24).prop_flat_map(|size| {
        (0..size)
            .map(|i| {
                if i == 0 {
                    Just(Vec::new()).boxed()
                } else {
                    prop::collection::vec(0..i, 0..4).boxed()
                }
            })
            .collect::<Vec<_>>()
    })
}

fn graph_and_order() -> impl Strategy<Value = (Vec<Vec<usize>>, Vec<usize>)> {
    dag_strategy().prop_flat_map(|graph| {
        let order: Vec<usize> = (0..graph.len()).collect();
        (Just(graph), Just(order).prop_shuffle())
    })
}

fn name(i: usize) -> String {
    format!("m{}", i)
}

proptest! {
    #[test]
    fn test_topological_correctness((graph, order) in graph_and_order(), runner_first in any::<bool>()) {
        // Invariant: every module loads after all of its dependencies
        let loader = Loader::new();
        let log: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
        let all: Vec<String> = (0..graph.len()).map(name).collect();

        if runner_first {
            loader.run(all.clone(), |_, _, _| Ok(()));
        }
        for &i in &order {
            let deps: Vec<String> = graph[i].iter().copied().map(name).collect();
            let expected: Vec<String> = deps.clone();
            let log = Rc::clone(&log);
            loader.define(&name(i), deps, move |exports, _, injected| {
                // Injected exports arrive in declared order
                for (dep, dep_exports) in expected.iter().zip(injected) {
                    if dep_exports.get::<String>("name") != Some(dep) {
                        anyhow::bail!("dependency {} injected out of order", dep);
                    }
                }
                log.borrow_mut().push(i);
                exports.set("name", name(i));
                Ok(())
            });
        }
        if !runner_first {
            loader.run(all.clone(), |_, _, _| Ok(()));
        }

        prop_assert!(loader.debug().is_settled());
        prop_assert!(loader.pending_modules().is_empty());
        prop_assert!(loader.manager().failed_modules().is_empty());

        let log = log.borrow();
        prop_assert_eq!(log.len(), graph.len());
        let position: HashMap<usize, usize> =
            log.iter().enumerate().map(|(pos, &module)| (module, pos)).collect();
        for (module, deps) in graph.iter().enumerate() {
            for dep in deps {
                prop_assert!(position[dep] < position[&module]);
            }
        }
    }

    #[test]
    fn test_factory_invoked_at_most_once(
        names in prop::collection::vec(0usize..6, 1..30),
        runs in prop::collection::vec(prop::collection::vec(0usize..6, 0..4), 0..10),
    ) {
        // Invariant: repeated definitions and sweeps never re-run a factory
        let loader = Loader::new();
        let counts: Rc<RefCell<HashMap<usize, usize>>> = Rc::new(RefCell::new(HashMap::new()));

        for (round, &i) in names.iter().enumerate() {
            let counts = Rc::clone(&counts);
            loader.define(&name(i), Vec::<String>::new(), move |exports, _, _| {
                *counts.borrow_mut().entry(i).or_insert(0) += 1;
                exports.set("round", round);
                Ok(())
            });
            if let Some(deps) = runs.get(round) {
                loader.run(deps.iter().copied().map(name), |_, _, _| Ok(()));
            }
        }
        for i in 0..6 {
            loader.run_named(&name(i));
        }
        loader.manager().load_runners();

        for (&module, &count) in counts.borrow().iter() {
            prop_assert_eq!(count, 1, "module {} instantiated {} times", module, count);
        }

        // First registration wins
        for i in 0..6 {
            if let Some(first) = names.iter().position(|&n| n == i) {
                let exports = loader.exports(&name(i));
                prop_assert_eq!(exports.and_then(|e| e.get::<usize>("round").copied()), Some(first));
            }
        }
    }

    #[test]
    fn test_blocker_gate(tokens in prop::collection::btree_set("[a-z]{1,6}", 1..5)) {
        // Invariant: a ready runner runs exactly when the last token is removed
        let loader = Loader::new();
        for token in &tokens {
            loader.add_runner_blocker(token);
        }
        let ran = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&ran);
        loader.run(Vec::<String>::new(), move |_, _, _| {
            *flag.borrow_mut() = true;
            Ok(())
        });

        let tokens: Vec<_> = tokens.into_iter().collect();
        for (index, token) in tokens.iter().enumerate() {
            prop_assert!(!*ran.borrow());
            let last = index + 1 == tokens.len();
            prop_assert_eq!(loader.remove_runner_blocker(token), last);
        }
        prop_assert!(*ran.borrow());
    }
}
