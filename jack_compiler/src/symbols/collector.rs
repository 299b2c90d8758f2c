//! Build scope tables from declarations

use crate::grammar::ast::nodes::{ClassDecl, ClassVarKind, SubroutineDecl, SubroutineKind, TypeName};
use crate::log_debug;
use crate::symbols::table::{ScopeLevel, StorageKind, SymbolTable};

/// Statics and fields, in declaration order
pub fn collect_class_symbols(class: &ClassDecl) -> SymbolTable {
    let mut table = SymbolTable::new(ScopeLevel::Class);

    for decl in &class.class_vars {
        let kind = match decl.kind {
            ClassVarKind::Static => StorageKind::Static,
            ClassVarKind::Field => StorageKind::Field,
        };
        for name in &decl.names {
            table.define(name, decl.var_type.clone(), kind);
        }
    }

    log_debug!("Class symbols collected",
        "class" => class.name.as_str(),
        "fields" => table.count(StorageKind::Field),
        "statics" => table.count(StorageKind::Static)
    );

    table
}

/// Parameters and locals of one subroutine. A method's receiver takes
/// argument 0, shifting explicit parameters to start at 1.
pub fn collect_subroutine_symbols(class_name: &str, subroutine: &SubroutineDecl) -> SymbolTable {
    let mut table = SymbolTable::new(ScopeLevel::Subroutine);

    if subroutine.kind == SubroutineKind::Method {
        table.define(
            "this",
            TypeName::Class(class_name.to_string()),
            StorageKind::Parameter,
        );
    }

    for parameter in &subroutine.parameters {
        table.define(
            &parameter.name,
            parameter.var_type.clone(),
            StorageKind::Parameter,
        );
    }

    for decl in &subroutine.locals {
        for name in &decl.names {
            table.define(name, decl.var_type.clone(), StorageKind::Local);
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_source;

    const SOURCE: &str = r#"
        class Ball {
            field int x, y;
            static int count;
            field Array trail;
            static boolean live;

            method void move(int dx, int dy) { var int i; var Ball other, spare; return; }
            function int make(int a) { return a; }
            constructor Ball new() { return this; }
        }
    "#;

    #[test]
    fn test_class_slots_dense_per_kind() {
        let class = parse_source(SOURCE).unwrap();
        let table = collect_class_symbols(&class);

        let slots: Vec<_> = ["x", "y", "trail", "count", "live"]
            .iter()
            .map(|name| {
                let entry = table.lookup(name).unwrap();
                (entry.kind, entry.index)
            })
            .collect();
        assert_eq!(
            slots,
            vec![
                (StorageKind::Field, 0),
                (StorageKind::Field, 1),
                (StorageKind::Field, 2),
                (StorageKind::Static, 0),
                (StorageKind::Static, 1),
            ]
        );
    }

    #[test]
    fn test_method_receiver_takes_argument_zero() {
        let class = parse_source(SOURCE).unwrap();
        let table = collect_subroutine_symbols("Ball", &class.subroutines[0]);

        let this = table.lookup("this").unwrap();
        assert_eq!(this.index, 0);
        assert_eq!(this.declared_type, TypeName::Class("Ball".into()));
        assert_eq!(table.lookup("dx").unwrap().index, 1);
        assert_eq!(table.lookup("dy").unwrap().index, 2);
        assert_eq!(table.lookup("spare").unwrap().index, 2);
        assert_eq!(table.count(StorageKind::Local), 3);
    }

    #[test]
    fn test_function_and_constructor_parameters_start_at_zero() {
        let class = parse_source(SOURCE).unwrap();

        let function = collect_subroutine_symbols("Ball", &class.subroutines[1]);
        assert_eq!(function.lookup("a").unwrap().index, 0);
        assert!(function.lookup("this").is_none());

        let constructor = collect_subroutine_symbols("Ball", &class.subroutines[2]);
        assert!(constructor.is_empty());
    }
}
