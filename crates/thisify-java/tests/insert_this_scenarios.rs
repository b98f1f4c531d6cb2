// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! End-to-end scenarios for the "Insert This" command.
//!
//! Each test opens Java source in an [`EditorSession`], places the caret,
//! runs [`insert_this`] against the real [`JavaReferenceIndex`] (or a wrapper
//! around it) and a [`RecordingHost`], then checks the resulting document
//! text and the host events.
//!
//! # Organization
//!
//! - `rewriting`: what gets qualified and what is left alone
//! - `members`: which members are visited
//! - `preconditions`: silent skips before anything is touched
//! - `transactions`: commit policy, refusal and rollback
//! - `options`: class boundary and member-kind toggles

use thisify_core::facts::MemberKind;
use thisify_core::host::{HostError, ProjectContext, ReferenceIndex, TransactionOutcome};
use thisify_java::ops::{
    insert_this, ClassBoundary, InsertThisError, InsertThisOptions, InsertThisOutcome,
    InsertThisReport, SkipCause, SkipReason, INSERT_THIS_LABEL,
};
use thisify_java::{EditorSession, HostEvent, RecordingHost};

fn run(
    session: &mut EditorSession,
    index: &dyn ReferenceIndex,
    host: &RecordingHost,
    options: &InsertThisOptions,
) -> Result<InsertThisOutcome, InsertThisError> {
    insert_this(ProjectContext::new(session, index, host), options)
}

fn applied(outcome: InsertThisOutcome) -> InsertThisReport {
    match outcome {
        InsertThisOutcome::Applied(report) => report,
        InsertThisOutcome::Skipped(cause) => panic!("command skipped: {cause}"),
    }
}

fn skipped(report: &InsertThisReport, reason: SkipReason) -> usize {
    report.skipped.get(&reason).copied().unwrap_or(0)
}

// ============================================================================
// Rewriting
// ============================================================================

mod rewriting {
    use super::*;
    use thisify_java::test_helpers::{project_index, session_at};

    #[test]
    fn field_use_in_getter_is_qualified() {
        let source = "class Foo {\n    int bar;\n    int getBar() {\n        return bar + 1;\n    }\n}\n";
        let (mut session, file) = session_at("Foo.java", source, "return");
        let index = project_index(&mut session, &[]);
        let host = RecordingHost::new();

        let report = applied(run(&mut session, &index, &host, &InsertThisOptions::default()).unwrap());

        assert_eq!(
            session.text(file).unwrap(),
            "class Foo {\n    int bar;\n    int getBar() {\n        return this.bar + 1;\n    }\n}\n"
        );
        assert_eq!(report.class_name, "Foo");
        assert_eq!(report.rewritten, 1);
        let visited: Vec<_> = report
            .members
            .iter()
            .map(|m| (m.kind, m.name.as_str(), m.rewritten))
            .collect();
        assert_eq!(
            visited,
            vec![
                (MemberKind::Field, "bar", 1),
                (MemberKind::Method, "getBar", 0),
            ]
        );
    }

    #[test]
    fn reference_inside_inner_class_is_left_alone() {
        let source = "class Foo {\n  int bar;\n  class Inner {\n    int x = bar;\n  }\n}\n";
        let (mut session, file) = session_at("Foo.java", source, "int bar");
        let index = project_index(&mut session, &[]);
        let host = RecordingHost::new();

        let report = applied(run(&mut session, &index, &host, &InsertThisOptions::default()).unwrap());

        assert_eq!(session.text(file).unwrap(), source);
        assert_eq!(report.rewritten, 0);
        assert_eq!(skipped(&report, SkipReason::NestedClass), 1);
    }

    #[test]
    fn call_inside_inner_class_is_left_alone() {
        let source = "class Foo {\n  void helper() { }\n  class Inner {\n    void g() { helper(); }\n  }\n}\n";
        let (mut session, file) = session_at("Foo.java", source, "void helper");
        let index = project_index(&mut session, &[]);
        let host = RecordingHost::new();

        let report = applied(run(&mut session, &index, &host, &InsertThisOptions::default()).unwrap());

        assert_eq!(session.text(file).unwrap(), source);
        assert_eq!(report.rewritten, 0);
        assert_eq!(skipped(&report, SkipReason::NestedClass), 1);
        assert!(host.events().iter().all(|e| !matches!(e, HostEvent::Committed { .. })));
    }

    #[test]
    fn qualified_reference_is_left_alone() {
        let source = "class Foo {\n  int bar;\n  int sum(Foo other) {\n    return other.bar + bar;\n  }\n}\n";
        let (mut session, file) = session_at("Foo.java", source, "return");
        let index = project_index(&mut session, &[]);
        let host = RecordingHost::new();

        let report = applied(run(&mut session, &index, &host, &InsertThisOptions::default()).unwrap());

        assert_eq!(
            session.text(file).unwrap(),
            "class Foo {\n  int bar;\n  int sum(Foo other) {\n    return other.bar + this.bar;\n  }\n}\n"
        );
        assert_eq!(report.rewritten, 1);
        assert_eq!(skipped(&report, SkipReason::AlreadyQualified), 1);
    }

    #[test]
    fn constructor_delegation_is_never_qualified() {
        let source = "class Foo {\n  Foo() { this(5); }\n  Foo(int x) { }\n}\n";
        let (mut session, file) = session_at("Foo.java", source, "this(5)");
        let index = project_index(&mut session, &[]);
        let host = RecordingHost::new();

        let report = applied(run(&mut session, &index, &host, &InsertThisOptions::default()).unwrap());

        assert_eq!(session.text(file).unwrap(), source);
        assert_eq!(report.rewritten, 0);
        assert_eq!(report.members.len(), 2);
        assert!(report.members.iter().all(|m| m.kind == MemberKind::Method));
        assert_eq!(skipped(&report, SkipReason::ConstructorDelegation), 1);
    }

    #[test]
    fn call_to_method_named_like_class_is_never_qualified() {
        let source = "class Foo {\n  void Foo() { }\n  void f() {\n    Foo();\n  }\n}\n";
        let (mut session, file) = session_at("Foo.java", source, "void f");
        let index = project_index(&mut session, &[]);
        let host = RecordingHost::new();

        let report = applied(run(&mut session, &index, &host, &InsertThisOptions::default()).unwrap());

        assert_eq!(session.text(file).unwrap(), source);
        assert_eq!(report.rewritten, 0);
        assert_eq!(skipped(&report, SkipReason::ConstructorDelegation), 1);
    }

    #[test]
    fn bare_call_is_qualified_and_class_named_call_is_not() {
        let source = "class Foo {\n  void helper() { }\n  void run() {\n    helper();\n    Foo.helper();\n  }\n}\n";
        let (mut session, file) = session_at("Foo.java", source, "void run");
        let index = project_index(&mut session, &[]);
        let host = RecordingHost::new();

        let report = applied(run(&mut session, &index, &host, &InsertThisOptions::default()).unwrap());

        assert_eq!(
            session.text(file).unwrap(),
            "class Foo {\n  void helper() { }\n  void run() {\n    this.helper();\n    Foo.helper();\n  }\n}\n"
        );
        assert_eq!(report.rewritten, 1);
        assert_eq!(skipped(&report, SkipReason::AlreadyQualified), 1);
    }

    #[test]
    fn locals_and_parameters_are_not_fields() {
        let source = "class Foo {\n  int count;\n  void add(int count) {\n    int total = count;\n    count++;\n  }\n  void bump() {\n    count++;\n  }\n}\n";
        let (mut session, file) = session_at("Foo.java", source, "void bump");
        let index = project_index(&mut session, &[]);
        let host = RecordingHost::new();

        let report = applied(run(&mut session, &index, &host, &InsertThisOptions::default()).unwrap());

        assert_eq!(
            session.text(file).unwrap(),
            "class Foo {\n  int count;\n  void add(int count) {\n    int total = count;\n    count++;\n  }\n  void bump() {\n    this.count++;\n  }\n}\n"
        );
        assert_eq!(report.rewritten, 1);
    }

    #[test]
    fn running_twice_changes_nothing_the_second_time() {
        let source = "class Foo {\n  int bar;\n  void helper() { }\n  int run() {\n    helper();\n    return bar;\n  }\n}\n";
        let (mut session, file) = session_at("Foo.java", source, "int run");
        let index = project_index(&mut session, &[]);
        let host = RecordingHost::new();
        let options = InsertThisOptions::default();

        let first = applied(run(&mut session, &index, &host, &options).unwrap());
        let once = session.text(file).unwrap();
        assert_eq!(first.rewritten, 2);
        assert!(once.contains("this.helper();"));
        assert!(once.contains("return this.bar;"));

        let second = applied(run(&mut session, &index, &host, &options).unwrap());
        assert_eq!(second.rewritten, 0);
        assert_eq!(skipped(&second, SkipReason::AlreadyQualified), 2);
        assert_eq!(session.text(file).unwrap(), once);
    }

    #[test]
    fn references_from_other_files_are_counted_but_untouched() {
        let foo = "class Foo {\n  int bar;\n  int get() { return bar; }\n}\n";
        let user = "class User {\n  int read(Foo foo) { return foo.bar; }\n}\n";
        let (mut session, file) = session_at("Foo.java", foo, "int get");
        let index = project_index(&mut session, &[("User.java", user)]);
        let host = RecordingHost::new();

        let report = applied(run(&mut session, &index, &host, &InsertThisOptions::default()).unwrap());

        assert_eq!(
            session.text(file).unwrap(),
            "class Foo {\n  int bar;\n  int get() { return this.bar; }\n}\n"
        );
        assert_eq!(report.rewritten, 1);
        assert_eq!(skipped(&report, SkipReason::OtherFile), 1);
    }

    #[test]
    fn site_text_not_matching_field_name_is_skipped() {
        use thisify_core::facts::ReferenceSite;
        use thisify_java::test_helpers::MappedIndex;

        let source = "class Foo {\n  int bar;\n  int get() { return bar; }\n}\n";
        let (mut session, file) = session_at("Foo.java", source, "int get");
        let index = MappedIndex::new(project_index(&mut session, &[]), |site| ReferenceSite {
            text: "baz".to_string(),
            ..site
        });
        let host = RecordingHost::new();

        let report = applied(run(&mut session, &index, &host, &InsertThisOptions::default()).unwrap());

        assert_eq!(session.text(file).unwrap(), source);
        assert_eq!(report.rewritten, 0);
        assert_eq!(skipped(&report, SkipReason::NameMismatch), 1);
    }
}

// ============================================================================
// Members
// ============================================================================

mod members {
    use super::*;
    use thisify_core::patch::FileId;
    use thisify_java::ops::collect_instance_members;
    use thisify_java::test_helpers::{project_index, session_at, single_file};

    #[test]
    fn static_members_are_never_collected() {
        let (tree, class) = single_file(
            "class Foo {\n  static int a;\n  static int b;\n  int c;\n  int d;\n  static void s() { }\n}\n",
        );
        let members = collect_instance_members(&tree, FileId::new(0), &class).unwrap();
        let names: Vec<_> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["c", "d"]);
        assert!(members.iter().all(|m| !m.is_static));
    }

    #[test]
    fn static_field_uses_stay_unqualified() {
        let source = "class Foo {\n  static int a;\n  int c;\n  void m() {\n    a = c;\n  }\n}\n";
        let (mut session, file) = session_at("Foo.java", source, "void m");
        let index = project_index(&mut session, &[]);
        let host = RecordingHost::new();

        let report = applied(run(&mut session, &index, &host, &InsertThisOptions::default()).unwrap());

        assert_eq!(
            session.text(file).unwrap(),
            "class Foo {\n  static int a;\n  int c;\n  void m() {\n    a = this.c;\n  }\n}\n"
        );
        let names: Vec<_> = report.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["c", "m"]);
    }

    #[test]
    fn fields_are_visited_before_methods() {
        let source = "class Foo {\n  void first() { }\n  int x, y;\n  void second() { }\n  int z;\n}\n";
        let (mut session, _file) = session_at("Foo.java", source, "int z");
        let index = project_index(&mut session, &[]);
        let host = RecordingHost::new();

        let report = applied(run(&mut session, &index, &host, &InsertThisOptions::default()).unwrap());

        let visited: Vec<_> = report
            .members
            .iter()
            .map(|m| (m.kind, m.name.as_str()))
            .collect();
        assert_eq!(
            visited,
            vec![
                (MemberKind::Field, "x"),
                (MemberKind::Field, "y"),
                (MemberKind::Field, "z"),
                (MemberKind::Method, "first"),
                (MemberKind::Method, "second"),
            ]
        );
    }
}

// ============================================================================
// Preconditions
// ============================================================================

mod preconditions {
    use super::*;
    use thisify_java::test_helpers::{project_index, session_at};

    const SOURCE: &str = "package demo;\n\nclass Foo {\n  int bar;\n  int get() { return bar; }\n}\n";

    fn expect_skip(session: &mut EditorSession, cause: SkipCause) {
        let index = project_index(session, &[]);
        let host = RecordingHost::new();
        let outcome = run(session, &index, &host, &InsertThisOptions::default()).unwrap();
        assert_eq!(outcome, InsertThisOutcome::Skipped(cause));
        assert!(host.events().is_empty());
    }

    #[test]
    fn no_caret() {
        let (mut session, file) = session_at("Foo.java", SOURCE, "int get");
        session.clear_caret();
        expect_skip(&mut session, SkipCause::NoEditor);
        assert_eq!(session.text(file).unwrap(), SOURCE);
    }

    #[test]
    fn no_selected_file() {
        let (mut session, file) = session_at("Foo.java", SOURCE, "int get");
        session.clear_selection();
        expect_skip(&mut session, SkipCause::NoSelectedFile);
        assert_eq!(session.text(file).unwrap(), SOURCE);
    }

    #[test]
    fn caret_outside_any_class() {
        let (mut session, file) = session_at("Foo.java", SOURCE, "package");
        expect_skip(&mut session, SkipCause::NoClassAtCaret);
        assert_eq!(session.text(file).unwrap(), SOURCE);
    }

    #[test]
    fn caret_inside_anonymous_class() {
        let source = "class Foo {\n  int bar;\n  Runnable r = new Runnable() {\n    public void run() { int marker = bar; }\n  };\n}\n";
        let (mut session, file) = session_at("Foo.java", source, "marker");
        expect_skip(&mut session, SkipCause::AnonymousClass);
        assert_eq!(session.text(file).unwrap(), source);
    }
}

// ============================================================================
// Transactions
// ============================================================================

mod transactions {
    use super::*;
    use thisify_java::test_helpers::{project_index, session_at, FailingIndex};

    const SOURCE: &str = "class Foo {\n  int a, b;\n  int sum() {\n    return a + b;\n  }\n}\n";

    #[test]
    fn one_transaction_and_one_commit_per_changed_member() {
        let (mut session, file) = session_at("Foo.java", SOURCE, "int sum");
        let index = project_index(&mut session, &[]);
        let host = RecordingHost::new();

        let report = applied(run(&mut session, &index, &host, &InsertThisOptions::default()).unwrap());
        assert_eq!(report.rewritten, 2);

        let events = host.events();
        assert_eq!(
            events.first(),
            Some(&HostEvent::Acquired {
                file,
                label: INSERT_THIS_LABEL.to_string(),
            })
        );
        assert_eq!(
            host.committed_texts(),
            vec![
                "class Foo {\n  int a, b;\n  int sum() {\n    return this.a + b;\n  }\n}\n".to_string(),
                "class Foo {\n  int a, b;\n  int sum() {\n    return this.a + this.b;\n  }\n}\n".to_string(),
            ]
        );
        assert_eq!(host.last_outcome(), Some(TransactionOutcome::Committed));
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn member_without_references_does_not_mutate_or_commit() {
        let source = "class Foo {\n  int bar;\n  void m() { }\n}\n";
        let (mut session, file) = session_at("Foo.java", source, "void m");
        let revision = session.tree(file).unwrap().revision();
        let index = project_index(&mut session, &[]);
        let host = RecordingHost::new();

        let report = applied(run(&mut session, &index, &host, &InsertThisOptions::default()).unwrap());

        assert_eq!(report.rewritten, 0);
        assert!(report.members.iter().all(|m| m.rewritten == 0));
        assert_eq!(session.tree(file).unwrap().revision(), revision);
        assert!(host.committed_texts().is_empty());
        assert_eq!(host.last_outcome(), Some(TransactionOutcome::Committed));
    }

    #[test]
    fn refused_transaction_touches_nothing() {
        let (mut session, file) = session_at("Foo.java", SOURCE, "int sum");
        let index = project_index(&mut session, &[]);
        let host = RecordingHost::refusing("document is read-only");

        let err = run(&mut session, &index, &host, &InsertThisOptions::default()).unwrap_err();

        assert!(matches!(
            err,
            InsertThisError::Host(HostError::TransactionRefused { .. })
        ));
        assert_eq!(session.text(file).unwrap(), SOURCE);
        assert!(host.events().is_empty());
    }

    #[test]
    fn index_failure_rolls_back_earlier_rewrites() {
        let (mut session, file) = session_at("Foo.java", SOURCE, "int sum");
        let index = FailingIndex::new(project_index(&mut session, &[]), 2);
        let host = RecordingHost::new();

        let err = run(&mut session, &index, &host, &InsertThisOptions::default()).unwrap_err();

        assert!(matches!(err, InsertThisError::Host(HostError::Index(_))));
        assert_eq!(session.text(file).unwrap(), SOURCE);
        // The partial state was published, so the restored one is republished.
        assert_eq!(
            host.committed_texts(),
            vec![
                "class Foo {\n  int a, b;\n  int sum() {\n    return this.a + b;\n  }\n}\n".to_string(),
                SOURCE.to_string(),
            ]
        );
        assert_eq!(host.last_outcome(), Some(TransactionOutcome::RolledBack));
    }

    #[test]
    fn commit_failure_rolls_back() {
        let (mut session, file) = session_at("Foo.java", SOURCE, "int sum");
        let index = project_index(&mut session, &[]);
        let host = RecordingHost::failing_commit(1);

        let err = run(&mut session, &index, &host, &InsertThisOptions::default()).unwrap_err();

        assert!(matches!(
            err,
            InsertThisError::Host(HostError::CommitFailed { .. })
        ));
        assert_eq!(session.text(file).unwrap(), SOURCE);
        assert!(host.committed_texts().is_empty());
        assert_eq!(host.last_outcome(), Some(TransactionOutcome::RolledBack));
    }
}

// ============================================================================
// Options
// ============================================================================

mod options {
    use super::*;
    use thisify_java::test_helpers::{project_index, session_at};

    // Java rejects a nested class named like its outer class, but the parser
    // and index accept it, which is enough to tell the two boundaries apart.
    const SHADOWED: &str = "class Foo {\n  int bar;\n  static class Nested {\n    class Foo {\n      int x = bar;\n    }\n  }\n  int get() { return bar; }\n}\n";

    #[test]
    fn name_boundary_treats_same_named_class_as_same() {
        let (mut session, file) = session_at("Foo.java", SHADOWED, "int bar");
        let index = project_index(&mut session, &[]);
        let host = RecordingHost::new();

        let report = applied(run(&mut session, &index, &host, &InsertThisOptions::default()).unwrap());

        assert_eq!(report.rewritten, 2);
        assert!(session.text(file).unwrap().contains("int x = this.bar;"));
    }

    #[test]
    fn declaration_boundary_compares_declarations() {
        let (mut session, file) = session_at("Foo.java", SHADOWED, "int bar");
        let index = project_index(&mut session, &[]);
        let host = RecordingHost::new();
        let options = InsertThisOptions {
            class_boundary: ClassBoundary::Declaration,
            ..InsertThisOptions::default()
        };

        let report = applied(run(&mut session, &index, &host, &options).unwrap());

        assert_eq!(report.rewritten, 1);
        assert_eq!(skipped(&report, SkipReason::NestedClass), 1);
        let text = session.text(file).unwrap();
        assert!(text.contains("int x = bar;"));
        assert!(text.contains("return this.bar;"));
    }

    #[test]
    fn member_kind_toggles() {
        let source = "class Foo {\n  int bar;\n  void helper() { }\n  int run() {\n    helper();\n    return bar;\n  }\n}\n";

        let (mut session, file) = session_at("Foo.java", source, "int run");
        let index = project_index(&mut session, &[]);
        let host = RecordingHost::new();
        let fields_only = InsertThisOptions {
            methods: false,
            ..InsertThisOptions::default()
        };
        let report = applied(run(&mut session, &index, &host, &fields_only).unwrap());
        assert!(report.members.iter().all(|m| m.kind == MemberKind::Field));
        let text = session.text(file).unwrap();
        assert!(text.contains("    helper();"));
        assert!(text.contains("return this.bar;"));

        let (mut session, file) = session_at("Foo.java", source, "int run");
        let index = project_index(&mut session, &[]);
        let methods_only = InsertThisOptions {
            fields: false,
            ..InsertThisOptions::default()
        };
        let report = applied(run(&mut session, &index, &host, &methods_only).unwrap());
        assert!(report.members.iter().all(|m| m.kind == MemberKind::Method));
        let text = session.text(file).unwrap();
        assert!(text.contains("this.helper();"));
        assert!(text.contains("return bar;"));
    }
}
