use sea_orm::entity::prelude::*;

/// One membership edge. The composite key allows a single edge per pair.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "group_assignment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub groups_guid: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub users_guid: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupsGuid",
        to = "super::group::Column::Guid",
        on_delete = "Cascade"
    )]
    Group,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UsersGuid",
        to = "super::user::Column::Guid",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
