use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Principal {
    Table,
    Guid,
    Discriminator,
    Data,
    PrincipalRoles,
    Created,
}

#[derive(DeriveIden)]
enum User {
    Table,
    Guid,
    Id,
    Login,
    Password,
    FirstLogin,
    LastLogin,
}

#[derive(DeriveIden)]
enum Group {
    Table,
    Guid,
    Id,
}

#[derive(DeriveIden)]
enum GroupAssignment {
    Table,
    GroupsGuid,
    UsersGuid,
}

/// Identifier columns hold the 32-digit hex form.
fn guid_col<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name).char_len(32).not_null().to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Principal::Table)
                    .if_not_exists()
                    .col(guid_col(Principal::Guid).primary_key())
                    .col(ColumnDef::new(Principal::Discriminator).string().not_null())
                    .col(ColumnDef::new(Principal::Data).json_binary().not_null())
                    .col(
                        ColumnDef::new(Principal::PrincipalRoles)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Principal::Created)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(guid_col(User::Guid).primary_key())
                    .col(ColumnDef::new(User::Id).string().not_null().unique_key())
                    .col(ColumnDef::new(User::Login).string().null())
                    .col(ColumnDef::new(User::Password).string().null())
                    .col(
                        ColumnDef::new(User::FirstLogin)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(User::LastLogin)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_principal")
                            .from(User::Table, User::Guid)
                            .to(Principal::Table, Principal::Guid)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Group::Table)
                    .if_not_exists()
                    .col(guid_col(Group::Guid).primary_key())
                    .col(ColumnDef::new(Group::Id).string().not_null().unique_key())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_principal")
                            .from(Group::Table, Group::Guid)
                            .to(Principal::Table, Principal::Guid)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupAssignment::Table)
                    .if_not_exists()
                    .col(guid_col(GroupAssignment::GroupsGuid))
                    .col(guid_col(GroupAssignment::UsersGuid))
                    .primary_key(
                        Index::create()
                            .col(GroupAssignment::GroupsGuid)
                            .col(GroupAssignment::UsersGuid),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_assignment_group")
                            .from(GroupAssignment::Table, GroupAssignment::GroupsGuid)
                            .to(Group::Table, Group::Guid)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_assignment_user")
                            .from(GroupAssignment::Table, GroupAssignment::UsersGuid)
                            .to(User::Table, User::Guid)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_group_assignment_users_guid")
                    .table(GroupAssignment::Table)
                    .col(GroupAssignment::UsersGuid)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GroupAssignment::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Group::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Principal::Table).to_owned())
            .await
    }
}
