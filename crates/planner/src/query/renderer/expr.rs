use crate::query::{
    ast::expr::{BinaryOp, BinaryOperator, Expr, FunctionCall, Ident, Logical, LogicalOperator},
    renderer::{Render, Renderer},
};

impl Render for Expr {
    fn render(&self, r: &mut Renderer) {
        match self {
            Expr::Identifier(ident) => ident.render(r),
            Expr::Value(val) => r.add_param(val.clone()),
            Expr::Literal(sql) => r.sql.push_str(sql),
            Expr::BinaryOp(op) => op.render(r),
            Expr::Logical(logical) => logical.render(r),
            Expr::Not(expr) => {
                r.sql.push_str("NOT (");
                expr.render(r);
                r.sql.push(')');
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                expr.render(r);
                r.sql.push_str(if *negated { " NOT IN (" } else { " IN (" });
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        r.sql.push_str(", ");
                    }
                    item.render(r);
                }
                r.sql.push(')');
            }
            Expr::IsNull { expr, negated } => {
                expr.render(r);
                r.sql
                    .push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Expr::Exists { subquery, negated } => {
                r.sql
                    .push_str(if *negated { "NOT EXISTS (" } else { "EXISTS (" });
                subquery.render(r);
                r.sql.push(')');
            }
            Expr::FunctionCall(func) => func.render(r),
            Expr::Alias { expr, alias } => {
                expr.render(r);
                r.sql.push_str(" AS ");
                r.sql.push_str(&r.dialect.quote_identifier(alias));
            }
        }
    }
}

impl Render for Ident {
    fn render(&self, r: &mut Renderer) {
        if let Some(qualifier) = &self.qualifier {
            r.sql.push_str(&r.dialect.quote_identifier(qualifier));
            r.sql.push('.');
        }
        r.sql.push_str(&r.dialect.quote_identifier(&self.name));
    }
}

impl Render for BinaryOp {
    fn render(&self, r: &mut Renderer) {
        r.sql.push('(');
        self.left.render(r);

        let op_str = match self.op {
            BinaryOperator::Eq => " = ",
            BinaryOperator::NotEq => " <> ",
            BinaryOperator::Lt => " < ",
            BinaryOperator::LtEq => " <= ",
            BinaryOperator::Gt => " > ",
            BinaryOperator::GtEq => " >= ",
            BinaryOperator::Like => " LIKE ",
            BinaryOperator::NotLike => " NOT LIKE ",
        };
        r.sql.push_str(op_str);

        self.right.render(r);
        r.sql.push(')');
    }
}

impl Render for Logical {
    fn render(&self, r: &mut Renderer) {
        if let [single] = self.operands.as_slice() {
            single.render(r);
            return;
        }

        let op_str = match self.op {
            LogicalOperator::And => " AND ",
            LogicalOperator::Or => " OR ",
        };

        r.sql.push('(');
        for (i, operand) in self.operands.iter().enumerate() {
            if i > 0 {
                r.sql.push_str(op_str);
            }
            operand.render(r);
        }
        r.sql.push(')');
    }
}

impl Render for FunctionCall {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str(&self.name);
        r.sql.push('(');
        if self.distinct {
            r.sql.push_str("DISTINCT ");
        }
        if self.wildcard {
            r.sql.push('*');
        } else {
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    r.sql.push_str(", ");
                }
                arg.render(r);
            }
        }
        r.sql.push(')');
    }
}

#[cfg(test)]
mod tests {
    use crate::query::{
        ast::expr::{BinaryOperator, Expr, FunctionCall},
        dialect::{MySql, Postgres},
        qualified,
        renderer::to_sql,
        value,
    };
    use model::core::value::Value;

    #[test]
    fn test_render_in_list_binds_every_item() {
        let expr = Expr::InList {
            expr: Box::new(qualified("t", "name")),
            list: vec![value(Value::from("a")), value(Value::from("b"))],
            negated: true,
        };

        let (sql, params) = to_sql(&expr, &Postgres);
        assert_eq!(sql, r#""t"."name" NOT IN ($1, $2)"#);
        assert_eq!(params, vec![Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn test_render_logical_with_null_check() {
        let expr = Expr::or(vec![
            Expr::binary(
                qualified("t", "name"),
                BinaryOperator::NotEq,
                value(Value::from("a")),
            ),
            qualified("t", "name").is_null(),
        ]);

        let (sql, params) = to_sql(&expr, &MySql);
        assert_eq!(sql, "((`t`.`name` <> ?) OR `t`.`name` IS NULL)");
        assert_eq!(params, vec![Value::from("a")]);
    }

    #[test]
    fn test_render_single_operand_logical_is_unwrapped() {
        let expr = Expr::Logical(crate::query::ast::expr::Logical {
            op: crate::query::ast::expr::LogicalOperator::And,
            operands: vec![qualified("t", "id").is_not_null()],
        });

        let (sql, _) = to_sql(&expr, &Postgres);
        assert_eq!(sql, r#""t"."id" IS NOT NULL"#);
    }

    #[test]
    fn test_render_count_distinct() {
        let expr = Expr::FunctionCall(FunctionCall {
            name: "COUNT".to_string(),
            args: vec![qualified("t", "id")],
            wildcard: false,
            distinct: true,
        });

        let (sql, _) = to_sql(&expr.negate(), &Postgres);
        assert_eq!(sql, r#"NOT (COUNT(DISTINCT "t"."id"))"#);
    }
}
