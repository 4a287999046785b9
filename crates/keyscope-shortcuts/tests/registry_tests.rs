use keyscope_shortcuts::*;
use std::cell::RefCell;
use std::rc::Rc;

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(s: &str) -> KeySequence {
        s.parse().unwrap()
    }

    #[test]
    fn test_unregistered_id_leaves_no_trace() {
        let tree = SceneTree::new();
        let map = ShortcutMap::new();
        let id = map
            .register(NodeId(1), seq("Ctrl+S"), ShortcutScope::Application, true, true)
            .unwrap();

        assert!(map.unregister(id));
        assert!(!map.table_contains(id));
        assert!(map.ids_for(&seq("Ctrl+S")).is_empty());
        assert!(map.dispatch(&seq("Ctrl+S"), &tree, false).is_none());
    }

    #[test]
    fn test_window_scope_isolates_windows() {
        let mut tree = SceneTree::new();
        let (window_a, root_a) = tree.add_window();
        let (window_b, _) = tree.add_window();
        let field_a = tree.add_item(Some(root_a));
        let map = ShortcutMap::new();

        let in_a = map
            .register(window_a, seq("Ctrl+F"), ShortcutScope::Window, true, true)
            .unwrap();
        map.register(window_b, seq("Ctrl+F"), ShortcutScope::Window, true, true)
            .unwrap();

        tree.set_focus(Some(field_a));
        assert_eq!(
            map.dispatch(&seq("Ctrl+F"), &tree, false),
            DispatchResult::Activated {
                id: in_a,
                owner: window_a
            }
        );
    }

    #[test]
    fn test_application_duplicates_are_ambiguous() {
        let tree = SceneTree::new();
        let map = ShortcutMap::new();
        let a = map
            .register(NodeId(1), seq("Ctrl+N"), ShortcutScope::Application, true, true)
            .unwrap();
        let b = map
            .register(NodeId(2), seq("Ctrl+N"), ShortcutScope::Application, true, true)
            .unwrap();

        let diagnostics = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&diagnostics);
        map.on_diagnostic(move |d| sink.borrow_mut().push(d.clone()));

        assert_eq!(
            map.dispatch(&seq("Ctrl+N"), &tree, false),
            DispatchResult::ActivatedAmbiguously { ids: vec![a, b] }
        );
        assert!(matches!(
            diagnostics.borrow().as_slice(),
            [Diagnostic::AmbiguousActivation { .. }]
        ));
    }

    #[test]
    fn test_disabled_duplicate_does_not_cause_ambiguity() {
        let tree = SceneTree::new();
        let map = ShortcutMap::new();
        let a = map
            .register(NodeId(1), seq("Ctrl+N"), ShortcutScope::Application, true, true)
            .unwrap();
        map.register(NodeId(2), seq("Ctrl+N"), ShortcutScope::Application, false, true)
            .unwrap();

        assert_eq!(
            map.dispatch(&seq("Ctrl+N"), &tree, false),
            DispatchResult::Activated {
                id: a,
                owner: NodeId(1)
            }
        );
    }

    #[test]
    fn test_repeat_skips_non_repeating_records() {
        let tree = SceneTree::new();
        let map = ShortcutMap::new();
        map.register(NodeId(1), seq("Ctrl+Z"), ShortcutScope::Application, true, false)
            .unwrap();

        assert!(!map.dispatch(&seq("Ctrl+Z"), &tree, false).is_none());
        assert!(map.dispatch(&seq("Ctrl+Z"), &tree, true).is_none());
    }

    #[test]
    fn test_lookup_counts_only_reachable_records() {
        let mut tree = SceneTree::new();
        let (window, root) = tree.add_window();
        let (_, other_root) = tree.add_window();
        let map = ShortcutMap::new();
        map.register(window, seq("Ctrl+K, Ctrl+C"), ShortcutScope::Window, true, true);

        tree.set_focus(Some(root));
        assert_eq!(map.lookup(&seq("Ctrl+K"), &tree), SequenceMatch::PartialMatch);

        tree.set_focus(Some(other_root));
        assert_eq!(map.lookup(&seq("Ctrl+K"), &tree), SequenceMatch::NoMatch);
    }

    #[test]
    fn test_owner_removal_unregisters() {
        let mut tree = SceneTree::new();
        let (_, root) = tree.add_window();
        let button = tree.add_item(Some(root));
        tree.set_focus(Some(button));
        let map = ShortcutMap::new();
        let id = map
            .register(button, seq("Alt+O"), ShortcutScope::Window, true, true)
            .unwrap();

        for node in tree.remove(button) {
            map.remove_owner(node);
        }
        assert!(!map.contains(id));
        assert!(map.dispatch(&seq("Alt+O"), &tree, false).is_none());
    }

    #[test]
    fn test_clear_empties_map() {
        let map = ShortcutMap::new();
        map.register(NodeId(1), seq("A"), ShortcutScope::Application, true, true);
        map.register(NodeId(2), seq("B"), ShortcutScope::Window, true, true);
        map.clear();
        assert!(map.is_empty());
        assert!(map.ids_for(&seq("A")).is_empty());
    }

    #[test]
    fn test_removed_diagnostic_listener_is_silent() {
        let mut tree = SceneTree::new();
        let loose = tree.add_item(None);
        let map = ShortcutMap::new();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        let listener = map.on_diagnostic(move |_| *counter.borrow_mut() += 1);
        assert!(map.remove_diagnostic_listener(listener));

        map.register(loose, seq("F2"), ShortcutScope::Window, true, true);
        map.dispatch(&seq("F2"), &tree, false);
        assert_eq!(*count.borrow(), 0);
    }
}
