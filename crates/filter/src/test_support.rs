use crate::{
    behavior::{BoolCast, ColumnRewrite},
    schema::{Entity, Relation, Schema},
};

/// post ─< comments ─> author (user)
/// post >─< tags (through post_tag)
/// post ─> author (user)
pub(crate) fn blog_schema() -> Schema {
    Schema::new()
        .with(
            Entity::builder("post")
                .columns(["id", "title", "published"])
                .relation(
                    Relation::belongs_to_many("tags", "tag", "post_tag")
                        .junction_keys("post_id", "tag_id"),
                )
                .relation(Relation::has_many("comments", "comment").foreign_key("post_id"))
                .relation(Relation::belongs_to("author", "user").foreign_key("author_id"))
                .behavior(ColumnRewrite::new("writer", "author.name"))
                .build(),
        )
        .with(Entity::builder("tag").columns(["id", "name"]).build())
        .with(
            Entity::builder("comment")
                .columns(["id", "body", "post_id"])
                .relation(Relation::belongs_to("author", "user").foreign_key("user_id"))
                .build(),
        )
        .with(
            Entity::builder("user")
                .columns(["id", "name", "active"])
                .behavior(BoolCast::new(["active"]))
                .build(),
        )
}
