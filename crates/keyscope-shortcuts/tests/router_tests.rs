use keyscope_shortcuts::*;
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(s: &str) -> KeySequence {
        s.parse().unwrap()
    }

    fn chord(s: &str) -> KeyChord {
        s.parse().unwrap()
    }

    fn count_activations(shortcut: &Shortcut) -> Rc<Cell<u32>> {
        let count = Rc::new(Cell::new(0));
        let handle = Rc::clone(&count);
        shortcut.on_activated(move || handle.set(handle.get() + 1));
        count
    }

    #[test]
    fn test_held_key_activates_once_without_auto_repeat() {
        let tree = SceneTree::new();
        let map = ShortcutMap::new();
        let shortcut = Shortcut::declare(&map, NodeId(1));
        shortcut.set_sequence(seq("Ctrl+Enter"));
        shortcut.set_scope(ShortcutScope::Application);
        shortcut.set_auto_repeat(false);
        shortcut.finalize();
        let hits = count_activations(&shortcut);
        let mut router = KeyRouter::new(map.clone(), &RouterConfig::default());
        let key = chord("Ctrl+Enter");

        router.handle_key(&KeyEvent::press(key), &tree);
        for _ in 0..5 {
            assert_eq!(
                router.handle_key(&KeyEvent::repeat(key), &tree),
                RouteOutcome::Suppressed
            );
        }
        assert_eq!(hits.get(), 1);

        router.handle_key(&KeyEvent::release(key), &tree);
        router.handle_key(&KeyEvent::press(key), &tree);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_focus_selects_window_for_chorded_sequence() {
        let mut tree = SceneTree::new();
        let (window_a, root_a) = tree.add_window();
        let (window_b, root_b) = tree.add_window();
        let map = ShortcutMap::new();
        let a = Shortcut::new(&map, window_a, seq("Ctrl+K, Ctrl+D"), ShortcutScope::Window);
        let b = Shortcut::new(&map, window_b, seq("Ctrl+K, Ctrl+D"), ShortcutScope::Window);
        let hits_a = count_activations(&a);
        let hits_b = count_activations(&b);
        let mut router = KeyRouter::new(map.clone(), &RouterConfig::default());

        tree.set_focus(Some(root_b));
        router.handle_key(&KeyEvent::press(chord("Ctrl+K")), &tree);
        router.handle_key(&KeyEvent::press(chord("Ctrl+D")), &tree);
        tree.set_focus(Some(root_a));
        router.handle_key(&KeyEvent::press(chord("Ctrl+K")), &tree);
        router.handle_key(&KeyEvent::press(chord("Ctrl+D")), &tree);

        assert_eq!(hits_a.get(), 1);
        assert_eq!(hits_b.get(), 1);
    }

    #[test]
    fn test_configured_timeout() {
        let tree = SceneTree::new();
        let map = ShortcutMap::new();
        map.register(NodeId(1), seq("G, I"), ShortcutScope::Application, true, true);
        let config = RouterConfig {
            chord_timeout_ms: 100,
            ..RouterConfig::default()
        };
        let mut router = KeyRouter::new(map.clone(), &config);
        let start = Instant::now();

        router.handle_key(&KeyEvent::press(chord("G")).at(start), &tree);
        assert_eq!(
            router.next_deadline(),
            Some(start + Duration::from_millis(100))
        );
        let late = KeyEvent::press(chord("I")).at(start + Duration::from_millis(150));
        assert_eq!(router.handle_key(&late, &tree), RouteOutcome::NoMatch);
    }

    #[test]
    fn test_each_chord_rearms_deadline() {
        let tree = SceneTree::new();
        let map = ShortcutMap::new();
        let id = map
            .register(NodeId(1), seq("A, B, C"), ShortcutScope::Application, true, true)
            .unwrap();
        let mut router = KeyRouter::new(map.clone(), &RouterConfig::default());
        let start = Instant::now();
        let step = Duration::from_millis(800);

        assert_eq!(
            router.handle_key(&KeyEvent::press(chord("A")).at(start), &tree),
            RouteOutcome::Pending
        );
        assert_eq!(
            router.handle_key(&KeyEvent::press(chord("B")).at(start + step), &tree),
            RouteOutcome::Pending
        );
        assert_eq!(
            router.handle_key(&KeyEvent::press(chord("C")).at(start + step * 2), &tree),
            RouteOutcome::Dispatched(DispatchResult::Activated {
                id,
                owner: NodeId(1)
            })
        );
    }

    #[test]
    fn test_unmatched_key_is_not_consumed() {
        let tree = SceneTree::new();
        let map = ShortcutMap::new();
        let mut router = KeyRouter::new(map, &RouterConfig::default());
        let outcome = router.handle_key(&KeyEvent::press(chord("X")), &tree);
        assert!(!outcome.is_consumed());
    }

    #[test]
    fn test_modifier_order_is_irrelevant() {
        let tree = SceneTree::new();
        let map = ShortcutMap::new();
        map.register(NodeId(1), seq("Shift+Ctrl+Z"), ShortcutScope::Application, true, true);
        let mut router = KeyRouter::new(map.clone(), &RouterConfig::default());
        let event = KeyEvent::new(
            Key::Char('z'),
            Modifiers::CTRL | Modifiers::SHIFT,
            KeyEventKind::Press,
            Instant::now(),
        );
        assert!(router.handle_key(&event, &tree).is_consumed());
    }
}
