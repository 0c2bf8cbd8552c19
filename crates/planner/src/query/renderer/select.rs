use crate::query::{
    ast::{
        common::{JoinKind, OrderDir},
        select::{FromClause, JoinClause, OrderByExpr, Select},
    },
    renderer::{Render, Renderer},
};

impl Render for Select {
    fn render(&self, r: &mut Renderer) {
        // 1. SELECT clause
        r.sql.push_str("SELECT ");
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                r.sql.push_str(", ");
            }
            col.render(r);
        }

        // 2. FROM
        if let Some(from) = &self.from {
            r.sql.push(' ');
            from.render(r);
        }

        // 3. JOIN
        for join in &self.joins {
            r.sql.push(' ');
            join.render(r);
        }

        // 4. WHERE
        if let Some(where_clause) = &self.where_clause {
            r.sql.push_str(" WHERE ");
            where_clause.render(r);
        }

        // 5. GROUP BY
        if !self.group_by.is_empty() {
            r.sql.push_str(" GROUP BY ");
            for (i, expr) in self.group_by.iter().enumerate() {
                if i > 0 {
                    r.sql.push_str(", ");
                }
                expr.render(r);
            }
        }

        // 6. HAVING
        if let Some(having) = &self.having {
            r.sql.push_str(" HAVING ");
            having.render(r);
        }

        // 7. ORDER BY
        if !self.order_by.is_empty() {
            r.sql.push_str(" ORDER BY ");
            for (i, order) in self.order_by.iter().enumerate() {
                if i > 0 {
                    r.sql.push_str(", ");
                }
                order.render(r);
            }
        }

        // 8. LIMIT
        if let Some(limit) = &self.limit {
            r.sql.push_str(" LIMIT ");
            limit.render(r);
        }

        // 9. OFFSET
        if let Some(offset) = &self.offset {
            r.sql.push_str(" OFFSET ");
            offset.render(r);
        }
    }
}

impl Render for FromClause {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("FROM ");
        r.render_table_ref(&self.table);
        r.render_alias(&self.alias);
    }
}

impl Render for JoinClause {
    fn render(&self, r: &mut Renderer) {
        let join_str = match self.kind {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        };
        r.sql.push_str(&format!("{join_str} "));
        r.render_table_ref(&self.table);
        r.render_alias(&self.alias);
        r.sql.push_str(" ON ");
        self.on.render(r);
    }
}

impl Render for OrderByExpr {
    fn render(&self, r: &mut Renderer) {
        self.expr.render(r);
        if let Some(dir) = &self.direction {
            let dir_str = match dir {
                OrderDir::Asc => "ASC",
                OrderDir::Desc => "DESC",
            };
            r.sql.push(' ');
            r.sql.push_str(dir_str);
        }
    }
}

#[cfg(test)]
mod tests {
    use model::core::value::Value;

    use crate::query::{
        ast::{
            common::{JoinKind, OrderDir, TableRef},
            expr::{BinaryOperator, Expr, FunctionCall},
            select::{FromClause, JoinClause, OrderByExpr, Select},
        },
        dialect::{MySql, Postgres},
        ident, qualified,
        renderer::{Render, Renderer},
        value,
    };

    #[test]
    fn test_simple_select_postgres() {
        let ast = Select {
            columns: vec![ident("id"), ident("name")],
            from: Some(FromClause {
                table: TableRef {
                    schema: None,
                    name: "users".to_string(),
                },
                alias: None,
            }),
            where_clause: Some(Expr::binary(
                ident("id"),
                BinaryOperator::Eq,
                value(Value::Int(123)),
            )),
            ..Default::default()
        };

        let dialect = Postgres;
        let mut renderer = Renderer::new(&dialect);
        ast.render(&mut renderer);
        let (sql, params) = renderer.finish();

        assert_eq!(sql, r#"SELECT "id", "name" FROM "users" WHERE ("id" = $1)"#);
        assert_eq!(params, vec![Value::Int(123)]);
    }

    #[test]
    fn test_simple_select_mysql() {
        let ast = Select {
            columns: vec![ident("id"), ident("name")],
            from: Some(FromClause {
                table: TableRef {
                    schema: None,
                    name: "users".to_string(),
                },
                alias: None,
            }),
            where_clause: Some(Expr::binary(
                ident("id"),
                BinaryOperator::Eq,
                value(Value::String("abc".to_string())),
            )),
            ..Default::default()
        };

        let dialect = MySql;
        let mut renderer = Renderer::new(&dialect);
        ast.render(&mut renderer);
        let (sql, params) = renderer.finish();

        assert_eq!(sql, "SELECT `id`, `name` FROM `users` WHERE (`id` = ?)");
        assert_eq!(params, vec![Value::String("abc".to_string())]);
    }

    #[test]
    fn test_correlated_exists_numbers_placeholders_in_order() {
        let subquery = Select {
            columns: vec![Expr::Literal("1".to_string())],
            from: Some(FromClause {
                table: TableRef {
                    schema: None,
                    name: "comment".to_string(),
                },
                alias: Some("c".to_string()),
            }),
            where_clause: Some(Expr::and(vec![
                Expr::binary(
                    qualified("c", "body"),
                    BinaryOperator::Like,
                    value(Value::from("%rust%")),
                ),
                Expr::binary(
                    qualified("c", "post_id"),
                    BinaryOperator::Eq,
                    qualified("p", "id"),
                ),
            ])),
            group_by: vec![qualified("c", "post_id")],
            having: Some(Expr::binary(
                Expr::FunctionCall(FunctionCall {
                    name: "COUNT".to_string(),
                    args: vec![qualified("c", "id")],
                    wildcard: false,
                    distinct: true,
                }),
                BinaryOperator::GtEq,
                value(Value::Int(2)),
            )),
            ..Default::default()
        };

        let ast = Select {
            columns: vec![qualified("p", "id")],
            from: Some(FromClause {
                table: TableRef {
                    schema: None,
                    name: "post".to_string(),
                },
                alias: Some("p".to_string()),
            }),
            where_clause: Some(Expr::and(vec![
                Expr::binary(
                    qualified("p", "title"),
                    BinaryOperator::NotEq,
                    value(Value::from("draft")),
                ),
                Expr::Exists {
                    subquery: Box::new(subquery),
                    negated: true,
                },
            ])),
            limit: Some(value(Value::Int(10))),
            ..Default::default()
        };

        let dialect = Postgres;
        let mut renderer = Renderer::new(&dialect);
        ast.render(&mut renderer);
        let (sql, params) = renderer.finish();

        let expected_sql = concat!(
            r#"SELECT "p"."id" FROM "post" AS "p" WHERE (("p"."title" <> $1) AND NOT EXISTS ("#,
            r#"SELECT 1 FROM "comment" AS "c" WHERE (("c"."body" LIKE $2) AND ("c"."post_id" = "p"."id")) "#,
            r#"GROUP BY "c"."post_id" HAVING (COUNT(DISTINCT "c"."id") >= $3))) LIMIT $4"#
        );
        assert_eq!(sql, expected_sql);
        assert_eq!(
            params,
            vec![
                Value::from("draft"),
                Value::from("%rust%"),
                Value::Int(2),
                Value::Int(10)
            ]
        );
    }

    #[test]
    fn test_complex_select_postgres() {
        let ast = Select {
            columns: vec![
                qualified("u", "id"),
                Expr::Alias {
                    expr: Box::new(Expr::function("COUNT", vec![qualified("p", "id")])),
                    alias: "post_count".to_string(),
                },
            ],
            from: Some(FromClause {
                table: TableRef {
                    schema: None,
                    name: "users".to_string(),
                },
                alias: Some("u".to_string()),
            }),
            joins: vec![JoinClause {
                kind: JoinKind::Left,
                table: TableRef {
                    schema: None,
                    name: "posts".to_string(),
                },
                alias: Some("p".to_string()),
                on: Expr::binary(
                    qualified("u", "id"),
                    BinaryOperator::Eq,
                    qualified("p", "user_id"),
                ),
            }],
            where_clause: Some(Expr::binary(
                qualified("u", "status"),
                BinaryOperator::NotEq,
                value(Value::String("inactive".to_string())),
            )),
            order_by: vec![OrderByExpr {
                expr: qualified("u", "created_at"),
                direction: Some(OrderDir::Desc),
            }],
            limit: Some(value(Value::Int(10))),
            offset: Some(value(Value::Int(20))),
            ..Default::default()
        };

        let dialect = Postgres;
        let mut renderer = Renderer::new(&dialect);
        ast.render(&mut renderer);
        let (sql, params) = renderer.finish();

        let expected_sql = r#"SELECT "u"."id", COUNT("p"."id") AS "post_count" FROM "users" AS "u" LEFT JOIN "posts" AS "p" ON ("u"."id" = "p"."user_id") WHERE ("u"."status" <> $1) ORDER BY "u"."created_at" DESC LIMIT $2 OFFSET $3"#;
        assert_eq!(sql, expected_sql);
        assert_eq!(
            params,
            vec![
                Value::String("inactive".to_string()),
                Value::Int(10),
                Value::Int(20)
            ]
        );
    }
}
