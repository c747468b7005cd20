/// Storage integration tests against a fresh in-memory database.

use agora_db::{Database, NotifyChange, WatchTarget};

fn seeded() -> (Database, i64, i64) {
    let db = Database::open_in_memory().unwrap();
    let alice = db.create_member("alice", "alice@example.com", "hash", 0).unwrap();
    let board = db.create_board("General", "-1,0").unwrap();
    (db, alice, board)
}

#[test]
fn defaults_merge_under_member_rows() {
    let (db, alice, _) = seeded();
    db.set_notify_prefs(alice, &[("topic_notify", 3)]).unwrap();

    let raw = db.get_notify_prefs(&[alice], &[], false).unwrap();
    assert_eq!(raw[&alice].len(), 1);
    assert_eq!(raw[&0]["board_notify"], 1);

    let merged = db.get_notify_prefs(&[alice], &[], true).unwrap();
    assert!(!merged.contains_key(&0));
    assert_eq!(merged[&alice]["topic_notify"], 3);
    assert_eq!(merged[&alice]["board_notify"], 1);
    assert_eq!(merged[&alice]["announcements"], 0);
}

#[test]
fn members_without_rows_get_defaults() {
    let (db, alice, _) = seeded();
    let merged = db.get_notify_prefs(&[alice, 999], &["board_notify"], true).unwrap();
    assert_eq!(merged[&999]["board_notify"], 1);
    assert_eq!(merged[&alice].len(), 1);
}

#[test]
fn explicit_default_member_survives_merge() {
    let (db, alice, _) = seeded();
    let merged = db.get_notify_prefs(&[alice, 0], &["pm_new"], true).unwrap();
    assert_eq!(merged[&0]["pm_new"], 1);
}

#[test]
fn pref_filter_limits_names() {
    let (db, alice, _) = seeded();
    db.set_notify_prefs(alice, &[("board_notify_1", 2), ("msg_quote", 0)]).unwrap();
    let prefs = db.get_notify_prefs(&[alice], &["board_notify_1"], false).unwrap();
    assert_eq!(prefs[&alice].len(), 1);
    assert!(!prefs.contains_key(&0));
}

#[test]
fn delete_prefs_reverts_to_defaults() {
    let (db, alice, _) = seeded();
    db.set_notify_prefs(alice, &[("board_notify", 0), ("pm_new", 0)]).unwrap();
    assert_eq!(db.delete_notify_prefs(alice, &["board_notify"]).unwrap(), 1);

    let merged = db.get_notify_prefs(&[alice], &["board_notify", "pm_new"], true).unwrap();
    assert_eq!(merged[&alice]["board_notify"], 1);
    assert_eq!(merged[&alice]["pm_new"], 0);
}

#[test]
fn notify_change_pairs_pref_and_watch_rows() {
    let (db, alice, board) = seeded();
    let key = format!("board_notify_{board}");

    db.apply_notify_change(&NotifyChange {
        member_id: alice,
        pref_key: &key,
        value: 3,
        watch: Some((WatchTarget::Board(board), true)),
        ignore_topic: None,
    })
    .unwrap();
    assert!(db.is_watching(alice, WatchTarget::Board(board)).unwrap());
    assert_eq!(db.watchers(WatchTarget::Board(board)).unwrap(), vec![alice]);

    db.apply_notify_change(&NotifyChange {
        member_id: alice,
        pref_key: &key,
        value: 0,
        watch: Some((WatchTarget::Board(board), false)),
        ignore_topic: None,
    })
    .unwrap();
    assert!(!db.is_watching(alice, WatchTarget::Board(board)).unwrap());

    // The zero row stays behind as a tombstone.
    let prefs = db.get_notify_prefs(&[alice], &[key.as_str()], false).unwrap();
    assert_eq!(prefs[&alice][&key], 0);
}

#[test]
fn ignore_flag_toggles() {
    let (db, alice, board) = seeded();
    let (topic, _) = db.create_topic(board, alice, "Hello", "First post").unwrap();
    let key = format!("topic_notify_{topic}");

    let mut change = NotifyChange {
        member_id: alice,
        pref_key: &key,
        value: 0,
        watch: Some((WatchTarget::Topic(topic), false)),
        ignore_topic: Some((topic, true)),
    };
    db.apply_notify_change(&change).unwrap();
    assert!(db.is_ignoring_topic(alice, topic).unwrap());
    assert_eq!(db.topic_ignorers(topic).unwrap(), vec![alice]);

    change.ignore_topic = Some((topic, false));
    db.apply_notify_change(&change).unwrap();
    assert!(!db.is_ignoring_topic(alice, topic).unwrap());
}

#[test]
fn topic_counters_follow_posts_and_moves() {
    let (db, alice, general) = seeded();
    let news = db.create_board("News", "0").unwrap();

    let (topic, _) = db.create_topic(general, alice, "Hello", "First").unwrap();
    db.add_reply(topic, alice, "Re: Hello", "Second").unwrap();
    db.add_reply(topic, alice, "Re: Hello", "Third").unwrap();

    let board = db.get_board(general).unwrap().unwrap();
    assert_eq!((board.num_topics, board.num_posts), (1, 3));
    assert_eq!(db.get_topic(topic).unwrap().unwrap().num_replies, 2);

    db.move_topic(topic, news).unwrap();
    let from = db.get_board(general).unwrap().unwrap();
    let to = db.get_board(news).unwrap().unwrap();
    assert_eq!((from.num_topics, from.num_posts), (0, 0));
    assert_eq!((to.num_topics, to.num_posts), (1, 3));
    assert_eq!(db.get_topic(topic).unwrap().unwrap().board_id, news);

    let hits = db.search_messages("third", &[news], 0, 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].board_id, news);
}

#[test]
fn search_respects_boards_and_wildcards() {
    let (db, alice, general) = seeded();
    let hidden = db.create_board("Staff", "").unwrap();
    db.create_topic(general, alice, "Sale", "Everything 50% off").unwrap();
    db.create_topic(general, alice, "Other", "Nothing 50 percent").unwrap();
    db.create_topic(hidden, alice, "Secret sale", "50% off for staff").unwrap();

    let hits = db.search_messages("50%", &[general], 0, 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].subject, "Sale");

    let hits = db.search_messages("SALE", &[general, hidden], 0, 10).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].subject, "Secret sale");

    assert!(db.search_messages("sale", &[], 0, 10).unwrap().is_empty());
    assert_eq!(db.search_messages("sale", &[general, hidden], 1, 10).unwrap().len(), 1);
}

#[test]
fn attachments_carry_board_groups() {
    let (db, alice, _) = seeded();
    let staff = db.create_board("Staff", "").unwrap();
    let (_, msg) = db.create_topic(staff, alice, "Logs", "See attached").unwrap();

    let (id, hash) = db.insert_attachment(msg, "log.txt", "text/plain", b"hello").unwrap();
    assert_eq!(hash.len(), 64);

    db.increment_downloads(id).unwrap();
    let row = db.get_attachment(id).unwrap().unwrap();
    assert_eq!(row.board_groups, "");
    assert_eq!(row.size, 5);
    assert_eq!(row.downloads, 1);
    assert!(db.get_attachment(id + 1).unwrap().is_none());
}

#[test]
fn alerts_and_mail_queue() {
    let (db, alice, _) = seeded();
    db.insert_alert(alice, "topic", 1, "reply").unwrap();
    db.insert_alert(alice, "topic", 2, "reply").unwrap();

    let alerts = db.get_alerts(alice, 10).unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].content_id, 2);
    assert!(!alerts[0].is_read);

    assert_eq!(db.mark_alerts_read(alice).unwrap(), 2);
    assert_eq!(db.mark_alerts_read(alice).unwrap(), 0);

    db.queue_mail("alice@example.com", "Hi", "Body").unwrap();
    let mail = db.get_mail_queue().unwrap();
    assert_eq!(mail.len(), 1);
    assert_eq!(mail[0].recipient, "alice@example.com");
}

#[test]
fn member_lookup_is_case_insensitive() {
    let (db, alice, _) = seeded();
    let row = db.get_member_by_name("ALICE").unwrap().unwrap();
    assert_eq!(row.id, alice);
    assert_eq!(db.get_members_by_ids(&[alice, 42]).unwrap().len(), 1);
    assert!(db.get_member_by_id(0).unwrap().is_none());
}
